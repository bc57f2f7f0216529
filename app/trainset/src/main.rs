// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level binary for the train-set controller board: the static task
//! table and the call into `kern::startup::start_scheduler`.
//!
//! There is no `app.toml`/xtask packaging step here — the table below is
//! hand-written rather than build-script generated.

#![no_std]
#![no_main]

use abi::Priority;
use cortex_m_rt::entry;
use kern::startup::{start_scheduler, TaskDesc};

/// Board clock, used to derive the 100 Hz tick divisor (component E).
const CLOCK_HZ: u32 = 16_000_000;
const TICK_HZ: u32 = 100;

static TASKS: [TaskDesc; 7] = [
    TaskDesc { id: 0, priority: Priority(0), entry: task_idle::main },
    TaskDesc { id: 1, priority: Priority(1), entry: task_timer::main },
    TaskDesc { id: 2, priority: Priority(2), entry: task_serial_out::main },
    TaskDesc { id: 3, priority: Priority(2), entry: task_serial_in::main },
    TaskDesc { id: 4, priority: Priority(3), entry: task_datalink::main },
    TaskDesc { id: 5, priority: Priority(3), entry: task_phys::main },
    TaskDesc { id: 6, priority: Priority(2), entry: task_routing::main },
];

#[entry]
fn main() -> ! {
    start_scheduler(&TASKS, CLOCK_HZ / TICK_HZ)
}
