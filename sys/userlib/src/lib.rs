// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User application support library.
//!
//! Thin, safe wrappers around the eight kernel calls (component B), plus a
//! couple of small conveniences built on top of them. There is no
//! lease/borrow machinery here — messages are plain byte buffers, copied in
//! full by the kernel during a rendezvous, because this kernel has no MPU
//! model to make zero-copy cross-task borrows safe.
#![no_std]

pub use abi::*;

mod raw;

/// The result of a successful [`recv`].
#[derive(Copy, Clone, Debug)]
pub struct Message<'a> {
    pub sender_mailbox: u8,
    pub data: &'a [u8],
}

/// `GETID`: the caller's own task id.
pub fn get_id() -> TaskId {
    TaskId(raw::syscall(Sysnum::GetId, 0, 0, &[]) as u8)
}

/// `NICE`: move to the tail of `priority`'s ready ring.
pub fn nice(priority: Priority) {
    raw::syscall(Sysnum::Nice, priority.0 as u32, 0, &[]);
}

/// `SENDMSG`: send `payload` from mailbox `src` to mailbox `dst`. Returns
/// `Ok(())` on success or the negative failure code on error.
pub fn send(dst: u8, src: u8, payload: &[u8]) -> Result<(), i32> {
    let rc = raw::syscall(Sysnum::SendMsg, dst as u32, src as u32, payload);
    if rc == retcode::SUCCESS {
        Ok(())
    } else {
        Err(rc)
    }
}

/// `RECEIVEMSG`: block until a message arrives on `mailbox` (or any owned
/// mailbox, if `None`), writing its payload into `buf`.
pub fn recv<'a>(mailbox: Option<u8>, buf: &'a mut [u8]) -> Result<Message<'a>, i32> {
    let mb = mailbox.unwrap_or(MAILBOX_ANY as u8);
    let (rc, from, len) = raw::syscall_recv(mb, buf);
    if rc == retcode::SUCCESS {
        Ok(Message { sender_mailbox: from, data: &buf[..len as usize] })
    } else {
        Err(rc)
    }
}

/// `BIND`: claim a well-known mailbox, or any free one if `None`.
pub fn bind(desired: Option<u8>) -> Result<u8, i32> {
    let mb = desired.unwrap_or(MAILBOX_ANY as u8);
    let rc = raw::syscall(Sysnum::Bind, mb as u32, 0, &[]);
    if rc >= 0 {
        Ok(rc as u8)
    } else {
        Err(rc)
    }
}

/// `UNBIND`: release a mailbox the caller owns.
pub fn unbind(mailbox: u8) -> Result<(), i32> {
    let rc = raw::syscall(Sysnum::Unbind, mailbox as u32, 0, &[]);
    if rc == retcode::SUCCESS {
        Ok(())
    } else {
        Err(rc)
    }
}

/// `BLOCK`: yield until the next tick or event wakes this task.
pub fn block() {
    raw::syscall(Sysnum::Block, 0, 0, &[]);
}

/// `TERMINATE`: end the caller. Never returns.
pub fn terminate() -> ! {
    raw::syscall(Sysnum::Terminate, 0, 0, &[]);
    unreachable!("TERMINATE does not return control to the caller")
}

/// There is no `PANIC` kernel call in this design — a panicking task simply
/// terminates itself, same as calling [`terminate`] deliberately. The
/// scheduler reclaims its PCB and stack and runs whatever now heads the
/// highest non-empty ring.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    terminate()
}
