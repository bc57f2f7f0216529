// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed message-slot pool (component D, storage half).
//!
//! A slot is either on the free list or linked into exactly one mailbox
//! FIFO (invariant 3). The pool never allocates; every slot lives in this
//! fixed-size arena for the life of the kernel.

use crate::task::NONE;
use abi::{KernelError, MSG_MAX};

/// Sized generously above `MAILBOX_COUNT` so a burst of sends to several
/// mailboxes before any receive can still be serviced.
pub const POOL_SIZE: usize = 64;

#[derive(Copy, Clone, Debug)]
pub struct MsgSlot {
    pub sender: u8,
    pub len: u8,
    pub payload: [u8; MSG_MAX],
    /// Links within the free list, and (once allocated) within the owning
    /// mailbox's FIFO.
    pub next: u8,
    /// Links within the receiving owner's receive-log, the global
    /// send-order view used to resolve `RECEIVEMSG(ANY)`. Independent of
    /// `next` because a slot's position in its mailbox's FIFO and its
    /// position in the owner's cross-mailbox log can differ.
    pub log_prev: u8,
    pub log_next: u8,
}

impl MsgSlot {
    const fn new() -> Self {
        MsgSlot {
            sender: 0,
            len: 0,
            payload: [0; MSG_MAX],
            next: NONE,
            log_prev: NONE,
            log_next: NONE,
        }
    }
}

pub struct Pool {
    pub slots: [MsgSlot; POOL_SIZE],
    free_head: u8,
}

impl Pool {
    pub fn new() -> Self {
        let mut slots = [MsgSlot::new(); POOL_SIZE];
        for i in 0..POOL_SIZE - 1 {
            slots[i].next = (i + 1) as u8;
        }
        slots[POOL_SIZE - 1].next = NONE;
        Pool { slots, free_head: 0 }
    }

    pub fn alloc(&mut self, sender: u8, payload: &[u8]) -> Result<u8, KernelError> {
        if self.free_head == NONE {
            return Err(KernelError::ResourceExhausted);
        }
        let id = self.free_head;
        self.free_head = self.slots[id as usize].next;
        let slot = &mut self.slots[id as usize];
        slot.sender = sender;
        slot.len = payload.len() as u8;
        slot.payload[..payload.len()].copy_from_slice(payload);
        slot.next = NONE;
        Ok(id)
    }

    pub fn free(&mut self, id: u8) {
        self.slots[id as usize].next = self.free_head;
        self.free_head = id;
    }

    pub fn free_count(&self) -> usize {
        let mut n = 0;
        let mut cur = self.free_head;
        while cur != NONE {
            n += 1;
            cur = self.slots[cur as usize].next;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_free_round_trip() {
        let mut p = Pool::new();
        assert_eq!(p.free_count(), POOL_SIZE);
        let id = p.alloc(3, b"hi").unwrap();
        assert_eq!(p.free_count(), POOL_SIZE - 1);
        assert_eq!(&p.slots[id as usize].payload[..2], b"hi");
        p.free(id);
        assert_eq!(p.free_count(), POOL_SIZE);
    }

    #[test]
    fn exhaustion_fails_cleanly() {
        let mut p = Pool::new();
        for _ in 0..POOL_SIZE {
            p.alloc(0, &[]).unwrap();
        }
        assert_eq!(p.alloc(0, &[]), Err(KernelError::ResourceExhausted));
    }
}
