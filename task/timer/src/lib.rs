// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time server (component F). Binds `TIMER_MB`, parses each request as an
//! ASCII decimal count of centiseconds, counts it down one tick at a time,
//! and replies `" DONE "` when it reaches zero.
//!
//! At most one countdown runs at a time per server; a second server bound
//! to a different mailbox can run alongside this one if more are needed.

#![no_std]

use unwrap_lite::UnwrapLite;
use userlib::well_known::TIMER_MB;

/// Parses a payload like `b"250"` into a centisecond count. Non-digit bytes
/// end the scan rather than failing outright, so trailing whitespace or a
/// terminator byte in the caller's buffer doesn't matter.
fn parse_centiseconds(payload: &[u8]) -> u32 {
    let mut n: u32 = 0;
    for &b in payload {
        if !b.is_ascii_digit() {
            break;
        }
        n = n.saturating_mul(10).saturating_add((b - b'0') as u32);
    }
    n
}

pub fn main() -> ! {
    userlib::bind(Some(TIMER_MB)).unwrap_lite();
    let mut buf = [0u8; abi::MSG_MAX];

    loop {
        let msg = match userlib::recv(Some(TIMER_MB), &mut buf) {
            Ok(msg) => msg,
            Err(_) => continue,
        };
        let mut remaining = parse_centiseconds(msg.data);
        let sender = msg.sender_mailbox;

        while remaining > 0 {
            userlib::block();
            remaining -= 1;
        }

        let _ = userlib::send(sender, TIMER_MB, b" DONE ");
    }
}
