// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process table and ready queues (component A) plus the pre-emptive
//! scheduler's selection logic (component E).
//!
//! Each of the five priority levels is a circular doubly-linked ring of
//! `Task` indices; `Task::prev`/`Task::next` carry the links so no separate
//! node allocation is needed (array-index intrusive lists, per the
//! redesign notes).

use crate::task::{NextTask, Task, TaskState, NONE};
use abi::{Priority, PRIORITY_LEVELS};

#[derive(Copy, Clone, Debug)]
struct Ring {
    head: u8,
    /// Currently-running (or next-to-run) member of this ring.
    current: u8,
}

impl Ring {
    const fn empty() -> Self {
        Ring { head: NONE, current: NONE }
    }
}

pub struct ReadyQueues {
    rings: [Ring; PRIORITY_LEVELS as usize],
    /// Highest priority level with a non-empty ring. Level 0 is the idle
    /// task's level and is never empty once the kernel has booted, so this
    /// always resolves to *some* level.
    active: u8,
}

impl ReadyQueues {
    pub fn new() -> Self {
        ReadyQueues { rings: [Ring::empty(); PRIORITY_LEVELS as usize], active: 0 }
    }

    /// Appends `tid` to the tail of `prio`'s ring. If `prio` outranks the
    /// current active level, the active level advances to `prio`.
    pub fn add(&mut self, tasks: &mut [Task], tid: u8, prio: Priority) {
        tasks[tid as usize].priority = prio;
        let ring = &mut self.rings[prio.0 as usize];
        if ring.head == NONE {
            tasks[tid as usize].prev = tid;
            tasks[tid as usize].next = tid;
            ring.head = tid;
            ring.current = tid;
        } else {
            let head = ring.head;
            let tail = tasks[head as usize].prev;
            tasks[tail as usize].next = tid;
            tasks[head as usize].prev = tid;
            tasks[tid as usize].prev = tail;
            tasks[tid as usize].next = head;
        }
        if prio.is_more_urgent_than(Priority(self.active)) {
            self.active = prio.0;
        }
    }

    /// The task that would run if the scheduler ran right now.
    pub fn current(&self) -> Option<u8> {
        let c = self.rings[self.active as usize].current;
        if c == NONE {
            None
        } else {
            Some(c)
        }
    }

    /// Unlinks the head of the active ring (the currently running task) and
    /// returns it. If the ring empties, the active level drops to the
    /// highest remaining non-empty level (never below 0).
    pub fn remove_current(&mut self, tasks: &mut [Task]) -> Option<u8> {
        let level = self.active as usize;
        let ring = &mut self.rings[level];
        let cur = ring.current;
        if cur == NONE {
            return None;
        }
        self.unlink(tasks, level, cur);
        while self.rings[self.active as usize].head == NONE && self.active > 0 {
            self.active -= 1;
        }
        Some(cur)
    }

    fn unlink(&mut self, tasks: &mut [Task], level: usize, tid: u8) {
        let (prev, next) = (tasks[tid as usize].prev, tasks[tid as usize].next);
        let ring = &mut self.rings[level];
        if next == tid {
            ring.head = NONE;
            ring.current = NONE;
        } else {
            tasks[prev as usize].next = next;
            tasks[next as usize].prev = prev;
            if ring.head == tid {
                ring.head = next;
            }
            ring.current = next;
        }
    }

    /// Removes `tid` from whatever ring it currently occupies, regardless of
    /// whether it is the active ring's current member. Used by blocking
    /// receive and by rendezvous delivery's "remove the receiver" step.
    pub fn remove(&mut self, tasks: &mut [Task], tid: u8) {
        let level = tasks[tid as usize].priority.0 as usize;
        self.unlink(tasks, level, tid);
    }

    /// Round-robin advance within the active ring; never crosses levels.
    pub fn advance(&mut self, tasks: &[Task]) {
        let ring = &mut self.rings[self.active as usize];
        if ring.current != NONE {
            ring.current = tasks[ring.current as usize].next;
        }
    }

    /// `nice`: move `tid` from the tail of its current ring to the tail of
    /// `new_prio`'s ring, then re-evaluate whether the winning task changed.
    pub fn nice(&mut self, tasks: &mut [Task], tid: u8, new_prio: Priority) -> NextTask {
        let was_current = self.current() == Some(tid);
        self.remove(tasks, tid);
        self.recompute_active_after_removal();
        let winner_before = self.current();
        self.add(tasks, tid, new_prio);
        if was_current && self.current() != Some(tid) {
            NextTask::Other
        } else if winner_before != self.current() {
            NextTask::Other
        } else {
            NextTask::Same
        }
    }

    fn recompute_active_after_removal(&mut self) {
        while self.active > 0 && self.rings[self.active as usize].head == NONE {
            self.active -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn arena() -> Vec<Task> {
        (0..8).map(|_| Task::spawn(Priority(0))).collect()
    }

    #[test]
    fn single_task_rings_to_itself() {
        let mut tasks = arena();
        let mut rq = ReadyQueues::new();
        rq.add(&mut tasks, 0, Priority(2));
        assert_eq!(rq.current(), Some(0));
        assert_eq!(tasks[0].next, 0);
    }

    #[test]
    fn higher_priority_add_becomes_active() {
        let mut tasks = arena();
        let mut rq = ReadyQueues::new();
        rq.add(&mut tasks, 0, Priority(1));
        rq.add(&mut tasks, 1, Priority(3));
        assert_eq!(rq.current(), Some(1));
    }

    #[test]
    fn remove_current_falls_back_to_lower_level() {
        let mut tasks = arena();
        let mut rq = ReadyQueues::new();
        rq.add(&mut tasks, 0, Priority(0));
        rq.add(&mut tasks, 1, Priority(3));
        assert_eq!(rq.remove_current(&mut tasks), Some(1));
        assert_eq!(rq.current(), Some(0));
    }

    #[test]
    fn round_robin_advances_within_level_only() {
        let mut tasks = arena();
        let mut rq = ReadyQueues::new();
        rq.add(&mut tasks, 0, Priority(2));
        rq.add(&mut tasks, 1, Priority(2));
        assert_eq!(rq.current(), Some(0));
        rq.advance(&tasks);
        assert_eq!(rq.current(), Some(1));
        rq.advance(&tasks);
        assert_eq!(rq.current(), Some(0));
    }
}
