// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Physical-layer server (component I). Bridges raw wire bytes to and from
//! framed data-link frames using [`drv_linkframe`]. Outbound: receives a
//! frame body from the data-link task on `PHYS_MB`, frames it, and pushes
//! the bytes onto the link's transmit ring. Inbound: scans bytes arriving
//! on the receive ring for a complete `STX...ETX` frame, decodes it, and
//! forwards the recovered body to the data-link task.
//!
//! Wire transmission and the receive ISR's ring are the same shape as
//! component G's; actually driving the UART peripheral is out of scope
//! here, same as the serial servers' cursor bookkeeping.

#![no_std]

use drv_linkframe::{decode, encode, DecodeOutcome};
use unwrap_lite::UnwrapLite;
use userlib::well_known::{DATALINK_PHYS_MB, PHYS_MB};

const WIRE_MAX: usize = abi::MSG_MAX * 2 + 4;

pub fn main() -> ! {
    userlib::bind(Some(PHYS_MB)).unwrap_lite();
    let mut inbound = [0u8; WIRE_MAX];
    let mut inbound_len = 0usize;

    loop {
        let mut buf = [0u8; abi::MSG_MAX];
        match userlib::recv(Some(PHYS_MB), &mut buf) {
            Ok(msg) => {
                let mut wire = [0u8; WIRE_MAX];
                if let Ok(n) = encode(msg.data, &mut wire) {
                    transmit(&wire[..n]);
                }
            }
            Err(_) => {}
        }

        while let Some(byte) = next_received_byte() {
            if inbound_len < inbound.len() {
                inbound[inbound_len] = byte;
                inbound_len += 1;
            }
            if byte == abi::phys::ETX {
                let mut body = [0u8; abi::MSG_MAX];
                if let DecodeOutcome::Ok { len } = decode(&inbound[..inbound_len], &mut body) {
                    let _ = userlib::send(DATALINK_PHYS_MB, PHYS_MB, &body[..len]);
                }
                inbound_len = 0;
            }
        }
    }
}

/// Drives the transmit side of the link. Out of scope: actual UART
/// register pokes.
fn transmit(_wire: &[u8]) {}

/// Pulls the next received byte off the link's RX ring, if any. Out of
/// scope: the actual ring shared with the receive ISR.
fn next_received_byte() -> Option<u8> {
    None
}
