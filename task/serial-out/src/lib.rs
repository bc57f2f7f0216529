// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output server (component G). Receives a buffer from its caller and
//! drains it into the link's transmit ring one byte at a time, blocking
//! whenever the ring fills until the transmit-complete interrupt drains it.

#![no_std]

use drv_serial_ring::ByteRing;
use unwrap_lite::UnwrapLite;
use userlib::well_known::SERIAL_OUT_MB;

/// Transmit ring shared with the link's TX-empty ISR. Sized to `MSG_MAX` so
/// one whole message always fits without the server having to block mid
/// write for typical traffic.
static mut TX_RING: ByteRing<{ abi::MSG_MAX }> = ByteRing::new();

pub fn main() -> ! {
    userlib::bind(Some(SERIAL_OUT_MB)).unwrap_lite();
    let mut buf = [0u8; abi::MSG_MAX];

    loop {
        let msg = match userlib::recv(Some(SERIAL_OUT_MB), &mut buf) {
            Ok(msg) => msg,
            Err(_) => continue,
        };

        for &byte in msg.data {
            loop {
                // Interrupts disabled around the cursor update, matching the
                // no-shared-memory-except-the-ring rule for the ISR/server
                // boundary.
                let pushed = cortex_m::interrupt::free(|_| unsafe {
                    (*core::ptr::addr_of_mut!(TX_RING)).push(byte)
                });
                if pushed.is_ok() {
                    break;
                }
                userlib::block();
            }
        }
    }
}
