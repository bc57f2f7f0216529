// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data-link server (component H). Owns one [`drv_datalink_core::LinkState`]
//! and shuttles frames between the application layer (`DATALINK_APP_MB`)
//! and the physical layer (`DATALINK_PHYS_MB`). Frames are serialized to the
//! physical layer as `[control_byte, payload...]`; `drv_linkframe` handles
//! the actual wire stuffing one hop further down, inside the phys task.

#![no_std]

use abi::ControlByte;
use drv_datalink_core::{Frame, LinkState};
use unwrap_lite::UnwrapLite;
use userlib::well_known::{DATALINK_APP_MB, DATALINK_PHYS_MB, PHYS_MB};

fn serialize(frame: Frame) -> ([u8; abi::MSG_MAX + 1], usize) {
    let mut out = [0u8; abi::MSG_MAX + 1];
    out[0] = frame.control.encode();
    let len = frame.len as usize;
    out[1..1 + len].copy_from_slice(&frame.payload[..len]);
    (out, 1 + len)
}

fn deserialize(bytes: &[u8]) -> Option<Frame> {
    let (&control_byte, rest) = bytes.split_first()?;
    let control = ControlByte::decode(control_byte)?;
    let mut payload = [0u8; abi::MSG_MAX];
    let len = rest.len().min(abi::MSG_MAX);
    payload[..len].copy_from_slice(&rest[..len]);
    Some(Frame { control, payload, len: len as u8 })
}

fn emit(frame: Frame) {
    let (bytes, len) = serialize(frame);
    let _ = userlib::send(PHYS_MB, DATALINK_PHYS_MB, &bytes[..len]);
}

pub fn main() -> ! {
    userlib::bind(Some(DATALINK_APP_MB)).unwrap_lite();
    userlib::bind(Some(DATALINK_PHYS_MB)).unwrap_lite();

    let mut link = LinkState::new();
    let mut buf = [0u8; abi::MSG_MAX];

    loop {
        let msg = match userlib::recv(None, &mut buf) {
            Ok(msg) => msg,
            Err(_) => continue,
        };

        // The phys task is the only process that ever sends from `PHYS_MB`;
        // every other sender is an application-layer caller handing us an
        // outbound payload. `RecvResult` carries the sender's mailbox, not
        // which of ours the message landed on, so this is the only
        // discriminator available.
        if msg.sender_mailbox != PHYS_MB {
            if let Ok(frame) = link.on_send(msg.data) {
                emit(frame);
            }
            continue;
        }

        let Some(frame) = deserialize(msg.data) else { continue };
        let emissions = link.on_receive(frame);
        for i in 0..emissions.to_physical_len {
            if let Some(f) = emissions.to_physical[i] {
                emit(f);
            }
        }
        if let Some((payload, len)) = emissions.to_app {
            let _ = userlib::send(DATALINK_APP_MB, DATALINK_PHYS_MB, &payload[..len as usize]);
        }
    }
}
