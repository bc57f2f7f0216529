// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end check of invariant 7: messages accepted out of a sender's
//! `LinkState` arrive at the peer's application layer in the order they
//! were sent, even across a dropped frame and its NACK-triggered replay.

use abi::FrameType;
use drv_datalink_core::{Frame, LinkState};

/// Feeds `frame` through `to`'s `on_receive` and returns any application
/// payload it released, plus whatever control frames it wants to push back.
fn deliver(to: &mut LinkState, frame: Frame) -> (Option<Vec<u8>>, Vec<Frame>) {
    let emissions = to.on_receive(frame);
    let reply = (0..emissions.to_physical_len)
        .filter_map(|i| emissions.to_physical[i])
        .collect();
    let payload = emissions.to_app.map(|(p, len)| p[..len as usize].to_vec());
    (payload, reply)
}

#[test]
fn messages_arrive_in_send_order_despite_a_dropped_frame() {
    let mut sender = LinkState::new();
    let mut receiver = LinkState::new();

    let messages: [&[u8]; 5] = [b"one", b"two", b"three", b"four", b"five"];
    let frames: Vec<Frame> = messages.iter().map(|m| sender.on_send(m).unwrap()).collect();

    // Frame 1 ("two") never makes it to the wire; the rest arrive in order.
    let mut delivered = Vec::new();
    let mut first_nack = None;

    for (i, frame) in frames.iter().enumerate() {
        if i == 1 {
            continue;
        }
        let (payload, replies) = deliver(&mut receiver, *frame);
        delivered.extend(payload);
        for reply in replies {
            if reply.control.ty == FrameType::Nack && first_nack.is_none() {
                first_nack = Some(reply);
            }
        }
    }

    // Only "one" made it through before the gap stalled delivery.
    assert_eq!(delivered, vec![messages[0].to_vec()]);

    // Feed the receiver's NACK back to the sender, which replays every
    // outstanding frame starting at the requested sequence number.
    let nack = first_nack.expect("receiver must NACK on the out-of-sequence arrival");
    let replay_emissions = sender.on_receive(nack);
    let replay: Vec<Frame> =
        (0..replay_emissions.to_physical_len).filter_map(|i| replay_emissions.to_physical[i]).collect();
    assert_eq!(replay.len(), 4, "two through five should all be replayed");

    for frame in replay {
        let (payload, _) = deliver(&mut receiver, frame);
        delivered.extend(payload);
    }

    let expected: Vec<Vec<u8>> = messages.iter().map(|m| m.to_vec()).collect();
    assert_eq!(delivered, expected);
}
