// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The trainset kernel.
//!
//! This is the application-independent portion of the system: processes,
//! priorities, a trap-based system-call interface, and mailbox-based
//! message passing with blocking receive. Everything outside `arch` is
//! portable host-testable logic; `arch` is the only module that differs
//! between `cargo test` on the host and a real Cortex-M target.
//!
//! # Design principles
//!
//! 1. Static configuration: the task table is a `const` array fixed at
//!    build time, not loaded from a runtime config format.
//! 2. A strong preference for safe code where reasonable; the handful of
//!    `unsafe` blocks live in `arch` and `startup`.
//! 3. Simple, obviously-correct algorithms over clever ones, so the
//!    testable properties can be checked directly against this code rather
//!    than against a model of it.

#![cfg_attr(target_os = "none", no_std)]

#[macro_use]
extern crate ringbuf;

#[macro_use]
pub mod arch;

pub mod err;
pub mod event;
pub mod kernel;
pub mod mailbox;
pub mod pool;
pub mod sched;
pub mod startup;
pub mod syscalls;
pub mod task;
pub mod time;
