// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel bootstrap.
//!
//! The task table is a hand-written `const` array of [`TaskDesc`], built
//! once by [`start_scheduler`] into a live [`Kernel`] and never rebuilt.
//! There is no "has the kernel already started" flag carried across calls
//! the way a boolean would be — `start_scheduler` is simply the one place
//! that does this, called exactly once from `app/trainset::main`.

use crate::kernel::Kernel;
use abi::Priority;
use static_cell::StaticCell;

/// One entry in the static task table: a process identity, its initial
/// priority, and the function it starts running at. `entry` is unused by
/// the `fake` backend, which never boots a real task; `arm_m`'s
/// `start_first_task` uses it to seed every task's initial stack frame.
pub struct TaskDesc {
    pub id: u8,
    pub priority: Priority,
    pub entry: fn() -> !,
}

static KERNEL: StaticCell<Option<Kernel>> = StaticCell::new(None);

/// Builds a [`Kernel`] and spawns every entry in `tasks`. Split out from
/// [`start_scheduler`] so tests can exercise table construction without
/// also calling into `arch::start_first_task`, which never returns.
pub fn build_kernel(tasks: &[TaskDesc]) -> Kernel {
    let mut kernel = Kernel::new();
    for t in tasks {
        kernel.spawn(t.id, t.priority);
    }
    kernel
}

/// Builds the task table and jumps to the first task. Never returns.
///
/// # Panics
/// Panics if called more than once (the second call would silently discard
/// whatever state the first kernel had accumulated).
pub fn start_scheduler(tasks: &'static [TaskDesc], tick_divisor: u32) -> ! {
    let kernel = build_kernel(tasks);
    {
        let mut slot = KERNEL.borrow_mut();
        assert!(slot.is_none(), "start_scheduler called more than once");
        *slot = Some(kernel);
    }
    unsafe { crate::arch::start_first_task(tasks, tick_divisor) }
}

/// Runs `f` against the live kernel. Used by trap handlers on the real
/// target; never called by the host test suite, which drives `Kernel`
/// directly instead.
pub fn with_kernel<R>(f: impl FnOnce(&mut Kernel) -> R) -> R {
    let mut slot = KERNEL.borrow_mut();
    f(slot.as_mut().expect("start_scheduler must run before with_kernel"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never() -> ! {
        panic!("task entry points are not invoked by the host test suite")
    }

    #[test]
    fn build_kernel_spawns_every_task_in_table() {
        const TABLE: [TaskDesc; 3] = [
            TaskDesc { id: 0, priority: Priority(0), entry: never },
            TaskDesc { id: 1, priority: Priority(2), entry: never },
            TaskDesc { id: 2, priority: Priority(4), entry: never },
        ];
        let kernel = build_kernel(&TABLE);
        assert_eq!(kernel.current(), Some(2));
        assert_eq!(kernel.tasks[1].priority, Priority(2));
    }
}
