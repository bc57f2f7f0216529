// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ISR-to-server wakeup, expressed as a small bounded event channel rather
//! than a shared "is this task blocked" flag (design note: re-express
//! ISR-to-server wakeup as a bounded event channel).
//!
//! An ISR (or, in this host-testable kernel, whatever stands in for one)
//! posts one [`Reason`] naming the task to wake; the scheduler drains the
//! channel at the pendable interrupt and moves each named task from
//! `WaitingForEvent` back onto its ready ring. The channel never blocks a
//! producer: if it is full, the oldest un-drained event is dropped, because
//! by construction a task only cares that *a* wakeup arrived, not how many.

use core::convert::TryFrom;

/// Why a task was woken. `Context` does not name a task; it is the tick
/// ISR's generic round-robin-advance request and is handled separately by
/// the scheduler, not queued here.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Reason {
    Input0,
    Input1,
    Timer,
}

const CAPACITY: usize = 8;

pub struct EventQueue {
    events: [Option<(Reason, u8)>; CAPACITY],
    head: usize,
    len: usize,
}

impl EventQueue {
    pub const fn new() -> Self {
        EventQueue { events: [None; CAPACITY], head: 0, len: 0 }
    }

    /// Called from ISR context: post a wakeup for `target`. Never fails;
    /// if the queue is saturated the oldest event is overwritten, since a
    /// duplicate or merged wakeup for a still-blocked task is harmless.
    pub fn post(&mut self, reason: Reason, target: u8) {
        let idx = (self.head + self.len) % CAPACITY;
        if self.len == CAPACITY {
            self.head = (self.head + 1) % CAPACITY;
        } else {
            self.len += 1;
        }
        self.events[idx] = Some((reason, target));
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (Reason, u8)> + '_ {
        let count = self.len;
        self.len = 0;
        let head = self.head;
        self.head = 0;
        (0..count).map(move |i| self.events[(head + i) % CAPACITY].take().unwrap())
    }
}

impl TryFrom<u8> for Reason {
    type Error = ();
    fn try_from(v: u8) -> Result<Self, ()> {
        Ok(match v {
            0 => Reason::Input0,
            1 => Reason::Input1,
            2 => Reason::Timer,
            _ => return Err(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_post_order() {
        let mut q = EventQueue::new();
        q.post(Reason::Input0, 3);
        q.post(Reason::Timer, 5);
        let drained: std::vec::Vec<_> = q.drain().collect();
        assert_eq!(drained, std::vec![(Reason::Input0, 3), (Reason::Timer, 5)]);
        assert_eq!(q.drain().count(), 0);
    }

    #[test]
    fn saturation_drops_oldest() {
        let mut q = EventQueue::new();
        for i in 0..(CAPACITY as u8 + 2) {
            q.post(Reason::Input1, i);
        }
        let drained: std::vec::Vec<_> = q.drain().collect();
        assert_eq!(drained.len(), CAPACITY);
        assert_eq!(drained[0], (Reason::Input1, 2));
    }
}
