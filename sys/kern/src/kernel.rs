// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The kernel façade: ties the task arena, ready queues, mailbox registry,
//! message pool, and event queue together and implements the pure logic
//! behind every kernel call (components A, C, D, E). [`crate::syscalls`] is
//! the thin trap-boundary layer on top of this; everything here is plain
//! Rust that the host test suite exercises directly, with no dependency on
//! `arch`.

use crate::mailbox::MailboxTable;
use crate::pool::Pool;
use crate::sched::ReadyQueues;
use crate::task::{BlockedRecv, NextTask, RecvResult, Task, TaskState, NONE};
use abi::{KernelError, Priority, MAILBOX_ANY};

pub const MAX_TASKS: usize = 16;

pub struct Kernel {
    pub tasks: [Task; MAX_TASKS],
    pub rq: ReadyQueues,
    pub mailboxes: MailboxTable,
    pub pool: Pool,
    pub events: crate::event::EventQueue,
}

impl Kernel {
    pub fn new() -> Self {
        const DEAD: Task = Task::new_dead();
        Kernel {
            tasks: [DEAD; MAX_TASKS],
            rq: ReadyQueues::new(),
            mailboxes: MailboxTable::new(),
            pool: Pool::new(),
            events: crate::event::EventQueue::new(),
        }
    }

    /// Spawns a task at `tid` with the given priority and links it onto its
    /// ready ring. Used by `startup` to build the initial task table, and
    /// directly by tests.
    pub fn spawn(&mut self, tid: u8, priority: Priority) {
        self.tasks[tid as usize] = Task::spawn(priority);
        self.rq.add(&mut self.tasks, tid, priority);
    }

    pub fn current(&self) -> Option<u8> {
        self.rq.current()
    }

    // ---- component C: mailbox registry ----

    pub fn bind(&mut self, caller: u8, desired: Option<u8>) -> Result<u8, KernelError> {
        self.mailboxes.bind(desired, caller)
    }

    pub fn unbind(&mut self, caller: u8, id: u8) -> Result<(), KernelError> {
        if id as usize >= abi::MAILBOX_COUNT {
            return Err(KernelError::InvalidArgument);
        }
        if self.mailboxes.boxes[id as usize].owner != Some(caller) {
            return Err(KernelError::OwnershipViolation);
        }
        // Discard queued messages before the registry clears the FIFO
        // head: splice each out of the caller's receive-log, then return
        // its slot to the pool.
        let mut cur = self.mailboxes.boxes[id as usize].fifo_head;
        while cur != NONE {
            let next = self.pool.slots[cur as usize].next;
            self.splice_recv_log(caller, cur);
            self.pool.free(cur);
            cur = next;
        }
        self.mailboxes.unbind(id, caller)
    }

    // ---- components C+D: send / receive (the rendezvous) ----

    /// `send(dst_mb, src_mb, payload)`. `src_mb` must be owned by `caller`.
    pub fn send(
        &mut self,
        caller: u8,
        src_mb: u8,
        dst_mb: u8,
        payload: &[u8],
    ) -> Result<NextTask, KernelError> {
        if payload.len() > abi::MSG_MAX
            || src_mb as usize >= abi::MAILBOX_COUNT
            || dst_mb as usize >= abi::MAILBOX_COUNT
        {
            return Err(KernelError::InvalidArgument);
        }
        if self.mailboxes.boxes[src_mb as usize].owner != Some(caller) {
            return Err(KernelError::OwnershipViolation);
        }
        let receiver = self.mailboxes.boxes[dst_mb as usize]
            .owner
            .ok_or(KernelError::OwnershipViolation)?;

        let direct = matches!(self.tasks[receiver as usize].state, TaskState::WaitingForRecv)
            && self.tasks[receiver as usize]
                .blocked_recv
                .map(|b| b.mailbox.is_none() || b.mailbox == Some(dst_mb))
                .unwrap_or(false);

        let next = if direct {
            let cap = self.tasks[receiver as usize].recv_cap as usize;
            let n = payload.len().min(cap);
            let mut result = RecvResult { from: src_mb, len: n as u8, ..RecvResult::default() };
            result.payload[..n].copy_from_slice(&payload[..n]);
            self.tasks[receiver as usize].recv_result = Some(result);
            self.tasks[receiver as usize].blocked_recv = None;
            self.tasks[receiver as usize].state = TaskState::Ready;
            let priority = self.tasks[receiver as usize].priority;
            self.rq.add(&mut self.tasks, receiver, priority);
            NextTask::Same
        } else {
            let slot = self.pool.alloc(src_mb, payload)?;
            self.deliver_to_mailbox(dst_mb, receiver, slot);
            NextTask::Same
        };

        let promote = self.tasks[receiver as usize].priority.is_more_urgent_than(
            self.tasks[caller as usize].priority,
        );
        let promote = if promote { NextTask::Other } else { NextTask::Same };
        Ok(next.combine(promote))
    }

    fn deliver_to_mailbox(&mut self, mb: u8, owner: u8, slot_id: u8) {
        let mbox = &mut self.mailboxes.boxes[mb as usize];
        if mbox.fifo_head == NONE {
            mbox.fifo_head = slot_id;
            mbox.fifo_tail = slot_id;
        } else {
            let tail = mbox.fifo_tail;
            self.pool.slots[tail as usize].next = slot_id;
            mbox.fifo_tail = slot_id;
        }
        self.push_recv_log(owner, slot_id);
    }

    fn push_recv_log(&mut self, owner: u8, slot_id: u8) {
        let t = &mut self.tasks[owner as usize];
        self.pool.slots[slot_id as usize].log_prev = t.recv_log_tail;
        self.pool.slots[slot_id as usize].log_next = NONE;
        if t.recv_log_tail == NONE {
            t.recv_log_head = slot_id;
        } else {
            let tail = t.recv_log_tail;
            self.pool.slots[tail as usize].log_next = slot_id;
        }
        t.recv_log_tail = slot_id;
    }

    fn splice_recv_log(&mut self, owner: u8, slot_id: u8) {
        let (prev, next) = (self.pool.slots[slot_id as usize].log_prev, self.pool.slots[slot_id as usize].log_next);
        if prev == NONE {
            self.tasks[owner as usize].recv_log_head = next;
        } else {
            self.pool.slots[prev as usize].log_next = next;
        }
        if next == NONE {
            self.tasks[owner as usize].recv_log_tail = prev;
        } else {
            self.pool.slots[next as usize].log_prev = prev;
        }
    }

    /// `recv(mb, buf_cap)`, `mb = None` means `MAILBOX_ANY`. Returns
    /// `Ok(Some(result))` if satisfied immediately, `Ok(None)` if the caller
    /// is now blocked.
    pub fn recv(
        &mut self,
        caller: u8,
        mb: Option<u8>,
        cap: u8,
    ) -> Result<Option<RecvResult>, KernelError> {
        let chosen = match mb {
            Some(id) => {
                if id as usize >= abi::MAILBOX_COUNT {
                    return Err(KernelError::InvalidArgument);
                }
                if self.mailboxes.boxes[id as usize].owner != Some(caller) {
                    return Err(KernelError::OwnershipViolation);
                }
                if self.mailboxes.boxes[id as usize].is_empty() {
                    None
                } else {
                    Some(id)
                }
            }
            None => {
                // Oldest entry in the global send-order log, if any.
                let head = self.tasks[caller as usize].recv_log_head;
                if head == NONE {
                    None
                } else {
                    // Recover which mailbox it sits in by scanning owned
                    // mailboxes for the one whose FIFO head equals it, or
                    // whose FIFO contains it. The FIFO is singly linked
                    // head->tail in send order, same order as the log, so
                    // the mailbox's FIFO head is at or before this slot;
                    // since log order and a single mailbox's FIFO order
                    // agree, the mailbox owning `head` is the one whose
                    // FIFO head is `head` itself is not guaranteed when
                    // other mailboxes interleave, so compare by walking
                    // each owned mailbox's FIFO for membership of `head`.
                    let mut found = None;
                    for id in self.mailboxes.owned_by(caller) {
                        let mut cur = self.mailboxes.boxes[id as usize].fifo_head;
                        while cur != NONE {
                            if cur == head {
                                found = Some(id);
                                break;
                            }
                            cur = self.pool.slots[cur as usize].next;
                        }
                        if found.is_some() {
                            break;
                        }
                    }
                    found
                }
            }
        };

        let Some(mb_id) = chosen else {
            self.tasks[caller as usize].blocked_recv = Some(BlockedRecv { mailbox: mb });
            self.tasks[caller as usize].recv_cap = cap;
            self.tasks[caller as usize].state = TaskState::WaitingForRecv;
            self.rq.remove(&mut self.tasks, caller);
            return Ok(None);
        };

        let mbox = &mut self.mailboxes.boxes[mb_id as usize];
        let slot_id = mbox.fifo_head;
        let slot = self.pool.slots[slot_id as usize];
        mbox.fifo_head = slot.next;
        if mbox.fifo_head == NONE {
            mbox.fifo_tail = NONE;
        }
        self.splice_recv_log(caller, slot_id);

        let n = (slot.len as usize).min(cap as usize);
        let mut result = RecvResult { from: slot.sender, len: n as u8, ..RecvResult::default() };
        result.payload[..n].copy_from_slice(&slot.payload[..n]);
        self.pool.free(slot_id);
        Ok(Some(result))
    }

    /// Pops and clears a completed rendezvous result for `tid`, called once
    /// it is next scheduled after a direct-rendezvous send resolved it.
    pub fn take_recv_result(&mut self, tid: u8) -> Option<RecvResult> {
        self.tasks[tid as usize].recv_result.take()
    }

    // ---- component E: scheduler bits exposed to kernel calls ----

    pub fn nice(&mut self, caller: u8, new_prio: Priority) -> NextTask {
        self.rq.nice(&mut self.tasks, caller, new_prio)
    }

    pub fn block(&mut self, caller: u8) {
        self.tasks[caller as usize].state = TaskState::WaitingForEvent;
        self.rq.remove(&mut self.tasks, caller);
    }

    pub fn wake(&mut self, tid: u8) {
        if self.tasks[tid as usize].state == TaskState::WaitingForEvent {
            let prio = self.tasks[tid as usize].priority;
            self.tasks[tid as usize].state = TaskState::Ready;
            self.rq.add(&mut self.tasks, tid, prio);
        }
    }

    /// Drains pending ISR events and wakes their targets. Called by the
    /// scheduler at the pendable interrupt. Collects into a fixed-size
    /// buffer first because the drain iterator borrows `self.events` and
    /// `wake` needs `&mut self` as a whole.
    pub fn drain_events(&mut self) {
        let mut woken = [0u8; 8];
        let mut n = 0;
        for (_, tid) in self.events.drain() {
            woken[n] = tid;
            n += 1;
        }
        for &tid in &woken[..n] {
            self.wake(tid);
        }
    }

    pub fn terminate(&mut self, caller: u8) {
        let mut owned = [0u8; abi::MAILBOX_COUNT];
        let mut n = 0;
        for mb in self.mailboxes.owned_by(caller) {
            owned[n] = mb;
            n += 1;
        }
        for &mb in &owned[..n] {
            let _ = self.mailboxes.unbind(mb, caller);
        }
        self.rq.remove(&mut self.tasks, caller);
        self.tasks[caller as usize].state = TaskState::Dead;
    }

    pub fn tick(&mut self) {
        self.rq.advance(&self.tasks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_task_kernel() -> Kernel {
        let mut k = Kernel::new();
        k.spawn(0, Priority(0)); // idle
        k
    }

    #[test]
    fn s1_rendezvous() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(2)); // P1
        k.spawn(2, Priority(2)); // P2
        let mb = k.bind(1, Some(3)).unwrap();
        k.bind(2, Some(5)).unwrap();
        assert_eq!(k.recv(1, Some(mb), 32).unwrap(), None);
        let next = k.send(2, 5, mb, b"hi").unwrap();
        assert_eq!(next, NextTask::Same);
        let result = k.take_recv_result(1).unwrap();
        assert_eq!(&result.payload[..2], b"hi");
        assert_eq!(result.len, 2);
        assert_eq!(result.from, 5);
        assert_eq!(k.pool.free_count(), crate::pool::POOL_SIZE);
    }

    #[test]
    fn s2_priority_promotion() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(4)); // P1, high prio
        k.spawn(2, Priority(2)); // P2, running
        k.bind(1, Some(3)).unwrap();
        k.bind(2, Some(5)).unwrap();
        assert_eq!(k.recv(1, Some(3), 32).unwrap(), None);
        let next = k.send(2, 5, 3, b"x").unwrap();
        assert_eq!(next, NextTask::Other);
    }

    #[test]
    fn queued_when_receiver_not_blocked() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(1));
        k.spawn(2, Priority(1));
        k.bind(1, Some(3)).unwrap();
        k.bind(2, Some(5)).unwrap();
        k.send(2, 5, 3, b"later").unwrap();
        assert_eq!(k.pool.free_count(), crate::pool::POOL_SIZE - 1);
        let r = k.recv(1, Some(3), 32).unwrap().unwrap();
        assert_eq!(&r.payload[..5], b"later");
        assert_eq!(k.pool.free_count(), crate::pool::POOL_SIZE);
    }

    #[test]
    fn receive_any_observes_global_send_order_across_mailboxes() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(1));
        k.spawn(2, Priority(1));
        k.spawn(3, Priority(1));
        let a = k.bind(1, Some(3)).unwrap();
        let b = k.bind(1, Some(4)).unwrap();
        k.bind(2, Some(5)).unwrap();
        k.bind(3, Some(6)).unwrap();
        k.send(2, 5, b, b"second-mailbox-first").unwrap();
        k.send(3, 6, a, b"first-mailbox-second").unwrap();
        let r1 = k.recv(1, None, 32).unwrap().unwrap();
        assert_eq!(&r1.payload[..r1.len as usize], b"second-mailbox-first");
        let r2 = k.recv(1, None, 32).unwrap().unwrap();
        assert_eq!(&r2.payload[..r2.len as usize], b"first-mailbox-second");
    }

    #[test]
    fn invariant_ready_plus_blocked_equals_live() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(1));
        k.spawn(2, Priority(1));
        k.bind(1, Some(3)).unwrap();
        assert_eq!(k.recv(1, Some(3), 32).unwrap(), None);
        let live = k
            .tasks
            .iter()
            .filter(|t| t.state != TaskState::Dead)
            .count();
        assert_eq!(live, 3); // idle, 1 (blocked), 2 (ready)
    }

    #[test]
    fn send_rejects_unowned_source() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(1));
        k.spawn(2, Priority(1));
        k.bind(2, Some(5)).unwrap();
        assert_eq!(k.send(1, 5, 5, b"x"), Err(KernelError::OwnershipViolation));
    }

    #[test]
    fn unbind_discards_queued_messages_and_log_entries() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(1));
        k.spawn(2, Priority(1));
        k.bind(1, Some(3)).unwrap();
        k.bind(2, Some(5)).unwrap();
        k.send(2, 5, 3, b"orphaned").unwrap();
        assert_eq!(k.pool.free_count(), crate::pool::POOL_SIZE - 1);
        k.unbind(1, 3).unwrap();
        assert_eq!(k.pool.free_count(), crate::pool::POOL_SIZE);
        assert_eq!(k.tasks[1].recv_log_head, NONE);
    }

    #[test]
    fn send_rejects_oversized_payload() {
        let mut k = two_task_kernel();
        k.spawn(1, Priority(1));
        k.bind(1, Some(5)).unwrap();
        let big = [0u8; abi::MSG_MAX + 1];
        assert_eq!(k.send(1, 5, 5, &big), Err(KernelError::InvalidArgument));
    }
}
