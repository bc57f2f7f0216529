// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The process control block and the fixed task arena.
//!
//! Every live process has exactly one `Task` here, indexed by its
//! [`abi::TaskId`]. Ready-queue and mailbox-FIFO membership are expressed as
//! indices into this arena rather than pointers, per the intrusive-list
//! redesign: a ring is a `(head, tail)` pair of `Option<u8>`, and each `Task`
//! carries its own `prev`/`next` link.

use abi::Priority;

pub const NONE: u8 = u8::MAX;

/// What a blocked `RECEIVEMSG` is waiting on, stashed directly in the PCB.
/// Its presence *is* the blocking flag (see the data model's PCB
/// description).
#[derive(Copy, Clone, Debug)]
pub struct BlockedRecv {
    /// Mailbox the caller asked to receive on, or `None` for "any owned
    /// mailbox" (ABI sentinel `MAILBOX_ANY`).
    pub mailbox: Option<u8>,
}

/// The outcome of a completed receive, written into the PCB by whichever
/// side resolves it (direct rendezvous, or the receive path itself) and
/// picked up by `Kernel::take_recv_result` when the task is next scheduled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RecvResult {
    pub from: u8,
    pub len: u8,
    pub payload: [u8; abi::MSG_MAX],
}

impl Default for RecvResult {
    fn default() -> Self {
        RecvResult { from: 0, len: 0, payload: [0; abi::MSG_MAX] }
    }
}

/// Scheduling state of a task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    /// Linked into a priority ring, eligible to run.
    Ready,
    /// Suspended inside a `BLOCK` call, waiting for an external wake.
    WaitingForEvent,
    /// Suspended inside `RECEIVEMSG` with nothing queued.
    WaitingForRecv,
    /// Unlinked, PCB free for reuse.
    Dead,
}

/// One process control block.
#[derive(Clone, Debug)]
pub struct Task {
    pub state: TaskState,
    pub priority: Priority,
    /// Ring linkage within the current priority level.
    pub prev: u8,
    pub next: u8,
    /// Populated only while `state == WaitingForRecv`.
    pub blocked_recv: Option<BlockedRecv>,
    /// Caller-provided receive buffer capacity, valid only alongside
    /// `blocked_recv`. The real buffer lives in user memory on target
    /// hardware; the host-testable kernel copies directly into
    /// `recv_result` instead of reaching across an address space.
    pub recv_cap: u8,
    /// Set by a rendezvous `send`, or by the receive path itself once it
    /// dequeues a slot; cleared by `take_recv_result`.
    pub recv_result: Option<RecvResult>,
    /// Terminal cursor column, carried across pre-emption for the serial
    /// input server's line editing (opaque to the kernel; only the serial
    /// server interprets it).
    pub term_cursor: u8,
    /// Head/tail of this task's receive-log: the global send-order view
    /// across every mailbox it owns, used to resolve `RECEIVEMSG(ANY)`.
    /// Indices into the message pool, `NONE` when empty.
    pub recv_log_head: u8,
    pub recv_log_tail: u8,
}

impl Task {
    pub const fn new_dead() -> Self {
        Task {
            state: TaskState::Dead,
            priority: Priority(0),
            prev: NONE,
            next: NONE,
            blocked_recv: None,
            recv_cap: 0,
            recv_result: None,
            term_cursor: 0,
            recv_log_head: NONE,
            recv_log_tail: NONE,
        }
    }

    pub fn spawn(priority: Priority) -> Self {
        Task { state: TaskState::Ready, priority, ..Task::new_dead() }
    }
}

/// Merge hint for "does this change who should run next": every syscall
/// handler returns one of these alongside its ABI result so the dispatcher
/// knows whether to re-run scheduling before returning to user code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NextTask {
    Same,
    Other,
}

impl NextTask {
    pub fn combine(self, other: Self) -> Self {
        if self == NextTask::Other || other == NextTask::Other {
            NextTask::Other
        } else {
            NextTask::Same
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_is_sticky_other() {
        assert_eq!(NextTask::Same.combine(NextTask::Same), NextTask::Same);
        assert_eq!(NextTask::Same.combine(NextTask::Other), NextTask::Other);
        assert_eq!(NextTask::Other.combine(NextTask::Same), NextTask::Other);
    }
}
