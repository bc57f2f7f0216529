// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-stable types shared between the kernel, userlib, and every task.
//!
//! This crate is the single source of truth for kernel-call codes, sizing
//! constants, and the small set of types that cross the trap boundary. It
//! carries no logic of its own.

#![cfg_attr(not(test), no_std)]

use core::convert::TryFrom;

/// Payload bytes carried by one message, end to end.
pub const MSG_MAX: usize = 32;
/// Number of mailboxes each task may bind.
pub const MAILBOX_COUNT: usize = 16;
/// Sentinel mailbox id meaning "any mailbox I own, oldest message first".
pub const MAILBOX_ANY: u8 = 16;
/// Number of priority rings the ready queue is split into.
pub const PRIORITY_LEVELS: u8 = 5;
/// Sliding-window size for the data-link layer; also `MAX_SEQUENCE`.
pub const WINDOW: usize = 8;
pub const MAX_SEQUENCE: u8 = 8;

/// Fixed mailbox assignments every task agrees on ahead of time. The rest of
/// `0..MAILBOX_COUNT` is available to bind-any.
pub mod well_known {
    pub const SERIAL_OUT_MB: u8 = 0;
    pub const SERIAL_IN_MB: u8 = 1;
    pub const TIMER_MB: u8 = 2;
    pub const DATALINK_APP_MB: u8 = 3;
    pub const DATALINK_PHYS_MB: u8 = 4;
    pub const PHYS_MB: u8 = 5;
    pub const ROUTING_MB: u8 = 6;
}

/// Task priority. Unlike the scheduler this crate is descended from, **higher
/// numbers are more urgent** here: priority 4 pre-empts priority 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Priority(pub u8);

impl Priority {
    pub const MIN: Priority = Priority(0);
    pub const MAX: Priority = Priority(PRIORITY_LEVELS - 1);

    pub fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 > other.0
    }
}

/// Identifies a live task. Kept as a bare index into the kernel's task
/// arena; there is no generation counter because this kernel has no
/// equivalent of a "dead task" liveness problem (no restart model here).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskId(pub u8);

/// Kernel-call codes recognized by the trap dispatcher, in the order
/// confirmed by the `enum kernelcallcodes` this kernel's behavior was
/// distilled from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Sysnum {
    GetId = 0,
    Nice = 1,
    SendMsg = 2,
    ReceiveMsg = 3,
    Terminate = 4,
    Bind = 5,
    Unbind = 6,
    Block = 7,
}

impl TryFrom<u32> for Sysnum {
    type Error = ();

    fn try_from(x: u32) -> Result<Self, ()> {
        Ok(match x {
            0 => Sysnum::GetId,
            1 => Sysnum::Nice,
            2 => Sysnum::SendMsg,
            3 => Sysnum::ReceiveMsg,
            4 => Sysnum::Terminate,
            5 => Sysnum::Bind,
            6 => Sysnum::Unbind,
            7 => Sysnum::Block,
            _ => return Err(()),
        })
    }
}

/// Small-negative-integer ABI return codes, as seen across the trap
/// boundary. `sys/kern` deals in [`KernelError`] internally and only
/// narrows to these at the dispatcher.
pub mod retcode {
    pub const SUCCESS: i32 = 1;
    pub const DEFAULT_FAIL: i32 = -1;
    pub const SEND_FAIL: i32 = -2;
    pub const RECV_FAIL: i32 = -3;
    pub const BIND_FAIL: i32 = -4;
    pub const UNBIND_FAIL: i32 = -5;
}

/// One application-layer message, as exchanged between the application task
/// and the data-link task, and as embedded verbatim in a data-link `DATA`
/// frame's payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub struct AppMessage {
    pub code: u8,
    pub arg1: u8,
    pub arg2: u8,
}

impl AppMessage {
    pub const WIRE_LEN: usize = 3;

    pub fn to_bytes(self) -> [u8; Self::WIRE_LEN] {
        [self.code, self.arg1, self.arg2]
    }

    pub fn from_bytes(b: [u8; Self::WIRE_LEN]) -> Self {
        AppMessage { code: b[0], arg1: b[1], arg2: b[2] }
    }
}

/// Application message codes (external-interfaces wire format).
pub mod app_code {
    pub const HALL_TRIGGERED: u8 = 0xA0;
    pub const HALL_TRIGGERED_ACK: u8 = 0xA2;
    pub const HALL_RESET_REQUEST: u8 = 0xA8;
    pub const HALL_RESET_ACK: u8 = 0xAA;
    pub const MAG_DIR_SET: u8 = 0xC0;
    pub const MAG_DIR_ACK: u8 = 0xC2;
    pub const SWITCH_THROW: u8 = 0xE0;
    pub const SWITCH_THROW_ACK: u8 = 0xE2;
}

/// Physical-layer framing bytes.
pub mod phys {
    pub const STX: u8 = 0x02;
    pub const ETX: u8 = 0x03;
    pub const DLE: u8 = 0x10;
}

/// Data-link frame type, the 2-bit `type` field of the control byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum FrameType {
    Data = 0,
    Ack = 1,
    Nack = 2,
}

impl FrameType {
    pub fn from_bits(b: u8) -> Option<Self> {
        Some(match b & 0b11 {
            0 => FrameType::Data,
            1 => FrameType::Ack,
            2 => FrameType::Nack,
            _ => return None,
        })
    }
}

/// Data-link control byte: `{Nr:3, Ns:3, type:2}` from the LSB, bit-exact.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControlByte {
    pub nr: u8,
    pub ns: u8,
    pub ty: FrameType,
}

impl ControlByte {
    pub fn encode(self) -> u8 {
        (self.nr & 0x7) | ((self.ns & 0x7) << 3) | ((self.ty as u8) << 6)
    }

    pub fn decode(byte: u8) -> Option<Self> {
        Some(ControlByte {
            nr: byte & 0x7,
            ns: (byte >> 3) & 0x7,
            ty: FrameType::from_bits(byte >> 6)?,
        })
    }
}

/// Failure taxonomy, carried internally by `sys/kern` as
/// `Result<T, KernelError>` and narrowed to a [`retcode`] only at the trap
/// boundary.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KernelError {
    InvalidArgument,
    ResourceExhausted,
    OwnershipViolation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_byte_round_trips() {
        for ns in 0..8 {
            for nr in 0..8 {
                for ty in [FrameType::Data, FrameType::Ack, FrameType::Nack] {
                    let cb = ControlByte { nr, ns, ty };
                    assert_eq!(ControlByte::decode(cb.encode()), Some(cb));
                }
            }
        }
    }

    #[test]
    fn priority_ordering_is_higher_number_more_urgent() {
        assert!(Priority(4).is_more_urgent_than(Priority(0)));
        assert!(!Priority(0).is_more_urgent_than(Priority(4)));
    }
}
