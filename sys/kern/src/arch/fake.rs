// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-testable stand-in for the real Cortex-M trap and interrupt
//! machinery. Nothing here touches hardware; it exists so `startup` and
//! `syscalls` compile and can be exercised under `cargo test` without an
//! `arm_m` target, the way the kernel this one is descended from keeps a
//! `fake` backend for the same reason.

use core::sync::atomic::{AtomicU32, Ordering};

static CLOCK_FREQ: AtomicU32 = AtomicU32::new(0);

pub fn set_clock_freq(f: u32) {
    CLOCK_FREQ.store(f, Ordering::Relaxed);
}

pub fn disable_irq() {}
pub fn enable_irq() {}

/// Never returns on real hardware; here it exists only so `startup`'s
/// signature is the same across backends. Tests drive `Kernel` directly and
/// never call this.
pub fn start_first_task(_tasks: &'static [crate::startup::TaskDesc], _tick_divisor: u32) -> ! {
    panic!("start_first_task is not meaningful on the host backend");
}

pub fn now() -> crate::time::Timestamp {
    0.into()
}
