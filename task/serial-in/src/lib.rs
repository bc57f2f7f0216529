// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input server (component G). Posts a prompt, then drains characters from
//! a ring fed by the link's receive ISR through a [`drv_serial_ring`]
//! [`LineEditor`]; a completed line is forwarded to the routing task, which
//! doubles as the console's command sink.

#![no_std]

use drv_serial_ring::{ByteRing, LineEditor};
use unwrap_lite::UnwrapLite;
use userlib::well_known::{ROUTING_MB, SERIAL_IN_MB, SERIAL_OUT_MB};

const PROMPT: &[u8] = b"> ";
const LINE_CAPACITY: usize = abi::MSG_MAX;

/// Receive ring shared with the link's RX ISR.
static mut RX_RING: ByteRing<LINE_CAPACITY> = ByteRing::new();

pub fn main() -> ! {
    userlib::bind(Some(SERIAL_IN_MB)).unwrap_lite();
    let mut editor: LineEditor<LINE_CAPACITY> = LineEditor::new();

    let _ = userlib::send(SERIAL_OUT_MB, SERIAL_IN_MB, PROMPT);

    loop {
        let byte = loop {
            let popped =
                cortex_m::interrupt::free(|_| unsafe { (*core::ptr::addr_of_mut!(RX_RING)).pop() });
            match popped {
                Some(b) => break b,
                None => userlib::block(),
            }
        };

        let event = editor.feed(byte);
        if let Some(echo) = event.echo {
            let _ = userlib::send(SERIAL_OUT_MB, SERIAL_IN_MB, &[echo]);
        }
        if let Some((line, len)) = event.emitted_line {
            let _ = userlib::send(ROUTING_MB, SERIAL_IN_MB, &line[..len]);
            let _ = userlib::send(SERIAL_OUT_MB, SERIAL_IN_MB, PROMPT);
        }
    }
}
