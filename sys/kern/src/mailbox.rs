// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mailbox registry (component C).
//!
//! 16 mailboxes, each either owned by one task or linked into a circular
//! free-list used by bind-any. The free-list's membership is exactly the
//! set of unowned mailboxes (invariant 2 of the testable properties).

use crate::task::NONE;
use abi::{KernelError, MAILBOX_COUNT};

#[derive(Copy, Clone, Debug)]
pub struct Mailbox {
    pub owner: Option<u8>,
    /// Head/tail of this mailbox's message FIFO, as indices into the
    /// message pool.
    pub fifo_head: u8,
    pub fifo_tail: u8,
    /// Free-list linkage, meaningful only while `owner.is_none()`.
    pub free_prev: u8,
    pub free_next: u8,
}

impl Mailbox {
    const fn new() -> Self {
        Mailbox { owner: None, fifo_head: NONE, fifo_tail: NONE, free_prev: NONE, free_next: NONE }
    }

    pub fn is_empty(&self) -> bool {
        self.fifo_head == NONE
    }
}

pub struct MailboxTable {
    pub boxes: [Mailbox; MAILBOX_COUNT],
    free_head: u8,
}

impl MailboxTable {
    pub fn new() -> Self {
        let mut boxes = [Mailbox::new(); MAILBOX_COUNT];
        for i in 0..MAILBOX_COUNT {
            boxes[i].free_prev = if i == 0 { (MAILBOX_COUNT - 1) as u8 } else { (i - 1) as u8 };
            boxes[i].free_next = if i == MAILBOX_COUNT - 1 { 0 } else { (i + 1) as u8 };
        }
        MailboxTable { boxes, free_head: 0 }
    }

    fn unlink_free(&mut self, id: u8) {
        let (prev, next) = (self.boxes[id as usize].free_prev, self.boxes[id as usize].free_next);
        if next == id {
            // Only member of the free-list.
            self.free_head = NONE;
        } else {
            self.boxes[prev as usize].free_next = next;
            self.boxes[next as usize].free_prev = prev;
            if self.free_head == id {
                self.free_head = next;
            }
        }
    }

    fn relink_free(&mut self, id: u8) {
        if self.free_head == NONE {
            self.boxes[id as usize].free_prev = id;
            self.boxes[id as usize].free_next = id;
            self.free_head = id;
        } else {
            let head = self.free_head;
            let tail = self.boxes[head as usize].free_prev;
            self.boxes[tail as usize].free_next = id;
            self.boxes[head as usize].free_prev = id;
            self.boxes[id as usize].free_prev = tail;
            self.boxes[id as usize].free_next = head;
        }
    }

    /// `desired == None` means bind-any: claim the free-list head.
    pub fn bind(&mut self, desired: Option<u8>, caller: u8) -> Result<u8, KernelError> {
        let id = match desired {
            None => {
                if self.free_head == NONE {
                    return Err(KernelError::ResourceExhausted);
                }
                self.free_head
            }
            Some(id) => {
                if id as usize >= MAILBOX_COUNT {
                    return Err(KernelError::InvalidArgument);
                }
                if self.boxes[id as usize].owner.is_some() {
                    return Err(KernelError::OwnershipViolation);
                }
                id
            }
        };
        self.unlink_free(id);
        self.boxes[id as usize].owner = Some(caller);
        Ok(id)
    }

    /// Returns the ids of any queued slots so the caller can return them to
    /// the pool; this table does not own the pool.
    pub fn unbind(&mut self, id: u8, caller: u8) -> Result<(), KernelError> {
        if id as usize >= MAILBOX_COUNT {
            return Err(KernelError::InvalidArgument);
        }
        if self.boxes[id as usize].owner != Some(caller) {
            return Err(KernelError::OwnershipViolation);
        }
        self.boxes[id as usize].owner = None;
        self.boxes[id as usize].fifo_head = NONE;
        self.boxes[id as usize].fifo_tail = NONE;
        self.relink_free(id);
        Ok(())
    }

    /// Every mailbox currently owned by `owner`, for bind-any receive
    /// fallback scans and for termination cleanup.
    pub fn owned_by(&self, owner: u8) -> impl Iterator<Item = u8> + '_ {
        (0..MAILBOX_COUNT as u8).filter(move |&id| self.boxes[id as usize].owner == Some(owner))
    }

    pub fn free_list_members(&self) -> impl Iterator<Item = u8> + '_ {
        let start = self.free_head;
        let mut cur = start;
        let mut done = start == NONE;
        core::iter::from_fn(move || {
            if done {
                return None;
            }
            let out = cur;
            cur = self.boxes[cur as usize].free_next;
            if cur == start {
                done = true;
            }
            Some(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_table_has_all_mailboxes_free() {
        let t = MailboxTable::new();
        assert_eq!(t.free_list_members().count(), MAILBOX_COUNT);
    }

    #[test]
    fn bind_any_claims_and_unbind_restores() {
        let mut t = MailboxTable::new();
        let id = t.bind(None, 7).unwrap();
        assert_eq!(t.free_list_members().count(), MAILBOX_COUNT - 1);
        assert!(!t.free_list_members().any(|m| m == id));
        t.unbind(id, 7).unwrap();
        assert_eq!(t.free_list_members().count(), MAILBOX_COUNT);
    }

    #[test]
    fn bind_specific_already_owned_fails() {
        let mut t = MailboxTable::new();
        t.bind(Some(3), 1).unwrap();
        assert_eq!(t.bind(Some(3), 2), Err(KernelError::OwnershipViolation));
    }

    #[test]
    fn unbind_by_non_owner_fails() {
        let mut t = MailboxTable::new();
        t.bind(Some(3), 1).unwrap();
        assert_eq!(t.unbind(3, 2), Err(KernelError::OwnershipViolation));
    }

    #[test]
    fn bind_any_when_exhausted_fails() {
        let mut t = MailboxTable::new();
        for i in 0..MAILBOX_COUNT as u8 {
            t.bind(Some(i), 0).unwrap();
        }
        assert_eq!(t.bind(None, 0), Err(KernelError::ResourceExhausted));
    }
}
