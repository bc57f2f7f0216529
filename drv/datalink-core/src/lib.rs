// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data-link sliding-window state machine (component H).
//!
//! One [`LinkState`] is owned per physical link. It never touches physical
//! framing or the mailbox transport directly — callers hand it frames that
//! have already been decoded, and it hands back [`Emissions`] describing
//! what to send and what to deliver upward.
#![cfg_attr(not(test), no_std)]

use abi::{ControlByte, FrameType, MSG_MAX, WINDOW};

/// One data-link frame: a control byte plus an embedded application payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub control: ControlByte,
    pub payload: [u8; MSG_MAX],
    pub len: u8,
}

impl Frame {
    fn control_only(control: ControlByte) -> Self {
        Frame { control, payload: [0; MSG_MAX], len: 0 }
    }
}

/// What a call into [`LinkState`] produced: frames to hand to the physical
/// layer (in order), and at most one application message to deliver
/// upward. `to_physical[..to_physical_len]` is the live portion.
#[derive(Copy, Clone, Debug)]
pub struct Emissions {
    pub to_physical: [Option<Frame>; WINDOW],
    pub to_physical_len: usize,
    pub to_app: Option<([u8; MSG_MAX], u8)>,
}

impl Emissions {
    fn none() -> Self {
        Emissions { to_physical: [None; WINDOW], to_physical_len: 0, to_app: None }
    }

    fn one(frame: Frame) -> Self {
        let mut e = Self::none();
        e.to_physical[0] = Some(frame);
        e.to_physical_len = 1;
        e
    }
}

/// Raised by [`LinkState::on_send`] when the replay window is already full
/// (7 outstanding frames; invariant 5).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WindowFull;

fn seq_distance(from: u8, to: u8) -> u8 {
    (to + abi::MAX_SEQUENCE - from) % abi::MAX_SEQUENCE
}

/// Per-link sliding-window state. `Ns` is the next sequence number this end
/// will assign to an outbound frame; `Nr` is the sequence number this end
/// next expects from the peer. `oldest_unacked` is the lowest sequence
/// number whose replay slot is still occupied — tracking it directly (rather
/// than scanning the window) is what lets ACK handling release exactly the
/// newly-confirmed slots without double-freeing one NACK retransmission and
/// a later ACK might both touch.
pub struct LinkState {
    ns: u8,
    nr: u8,
    oldest_unacked: u8,
    window: [Option<Frame>; WINDOW],
}

impl LinkState {
    pub const fn new() -> Self {
        LinkState { ns: 0, nr: 0, oldest_unacked: 0, window: [None; WINDOW] }
    }

    pub fn ns(&self) -> u8 {
        self.ns
    }

    pub fn nr(&self) -> u8 {
        self.nr
    }

    /// Outstanding (sent, not yet acked) frame count.
    pub fn outstanding(&self) -> u8 {
        seq_distance(self.oldest_unacked, self.ns)
    }

    /// Stamps an outbound application payload with the current `{Ns, Nr,
    /// DATA}`, stores it in the replay window, and advances `Ns`.
    pub fn on_send(&mut self, payload: &[u8]) -> Result<Frame, WindowFull> {
        if self.outstanding() >= abi::MAX_SEQUENCE - 1 {
            return Err(WindowFull);
        }
        let mut buf = [0u8; MSG_MAX];
        let len = payload.len().min(MSG_MAX);
        buf[..len].copy_from_slice(&payload[..len]);
        let frame = Frame {
            control: ControlByte { nr: self.nr, ns: self.ns, ty: FrameType::Data },
            payload: buf,
            len: len as u8,
        };
        self.window[self.ns as usize] = Some(frame);
        self.ns = (self.ns + 1) % abi::MAX_SEQUENCE;
        Ok(frame)
    }

    /// Processes one inbound frame from the physical layer.
    pub fn on_receive(&mut self, frame: Frame) -> Emissions {
        match frame.control.ty {
            FrameType::Data => self.on_receive_data(frame),
            FrameType::Ack => self.on_receive_ack(frame.control.nr),
            FrameType::Nack => self.on_receive_nack(frame.control.nr),
        }
    }

    fn on_receive_data(&mut self, frame: Frame) -> Emissions {
        if frame.control.ns != self.nr {
            let nack = Frame::control_only(ControlByte {
                nr: self.nr,
                ns: 0,
                ty: FrameType::Nack,
            });
            return Emissions::one(nack);
        }
        self.nr = (self.nr + 1) % abi::MAX_SEQUENCE;
        let ack = Frame::control_only(ControlByte { nr: self.nr, ns: 0, ty: FrameType::Ack });
        let mut e = Emissions::one(ack);
        e.to_app = Some((frame.payload, frame.len));
        e
    }

    fn on_receive_ack(&mut self, peer_nr: u8) -> Emissions {
        let distance = seq_distance(self.oldest_unacked, peer_nr);
        for i in 0..distance {
            let slot = (self.oldest_unacked + i) % abi::MAX_SEQUENCE;
            self.window[slot as usize] = None;
        }
        self.oldest_unacked = peer_nr;
        Emissions::none()
    }

    fn on_receive_nack(&mut self, peer_nr: u8) -> Emissions {
        let mut e = Emissions::none();
        let distance = seq_distance(peer_nr, self.ns);
        for i in 0..distance {
            let slot = (peer_nr + i) % abi::MAX_SEQUENCE;
            if let Some(frame) = self.window[slot as usize] {
                e.to_physical[e.to_physical_len] = Some(frame);
                e.to_physical_len += 1;
            }
        }
        e
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant5_outstanding_never_exceeds_seven() {
        let mut link = LinkState::new();
        for _ in 0..7 {
            link.on_send(b"x").unwrap();
        }
        assert_eq!(link.outstanding(), 7);
        assert_eq!(link.on_send(b"x"), Err(WindowFull));
    }

    #[test]
    fn data_in_sequence_is_accepted_and_acked() {
        let mut link = LinkState::new();
        let frame = Frame {
            control: ControlByte { nr: 0, ns: 0, ty: FrameType::Data },
            payload: {
                let mut p = [0u8; MSG_MAX];
                p[0] = 42;
                p
            },
            len: 1,
        };
        let e = link.on_receive(frame);
        assert_eq!(link.nr(), 1);
        assert_eq!(e.to_physical_len, 1);
        assert_eq!(e.to_physical[0].unwrap().control.ty, FrameType::Ack);
        assert_eq!(e.to_app.unwrap().0[0], 42);
    }

    #[test]
    fn data_out_of_sequence_is_nacked_and_not_forwarded() {
        let mut link = LinkState::new();
        let frame = Frame {
            control: ControlByte { nr: 0, ns: 3, ty: FrameType::Data },
            payload: [0; MSG_MAX],
            len: 0,
        };
        let e = link.on_receive(frame);
        assert_eq!(link.nr(), 0);
        assert_eq!(e.to_physical[0].unwrap().control.ty, FrameType::Nack);
        assert!(e.to_app.is_none());
    }

    #[test]
    fn s4_nack_replays_outstanding_frames_in_order() {
        let mut link = LinkState::new();
        for _ in 0..6 {
            link.on_send(b"x").unwrap();
        }
        assert_eq!(link.ns(), 6);

        let nack = Frame::control_only(ControlByte { nr: 3, ns: 0, ty: FrameType::Nack });
        let e = link.on_receive(nack);

        assert_eq!(e.to_physical_len, 3);
        assert_eq!(e.to_physical[0].unwrap().control.ns, 3);
        assert_eq!(e.to_physical[1].unwrap().control.ns, 4);
        assert_eq!(e.to_physical[2].unwrap().control.ns, 5);
    }

    #[test]
    fn ack_releases_slots_up_to_peer_nr() {
        let mut link = LinkState::new();
        for _ in 0..4 {
            link.on_send(b"x").unwrap();
        }
        let ack = Frame::control_only(ControlByte { nr: 2, ns: 0, ty: FrameType::Ack });
        link.on_receive(ack);
        assert_eq!(link.outstanding(), 2);
    }
}
