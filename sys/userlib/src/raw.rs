// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The actual trap instruction. Register convention: `r0` carries the call
//! code in and the return code out; `r1`/`r2` carry `arg1`/`arg2` in (and,
//! for `RECEIVEMSG`, the sender mailbox and received length out); `r3`/`r4`
//! carry the payload pointer and length.
//!
//! Mirrors `sys/kern`'s `arch` split: a real `svc`-based implementation for
//! the target, and a host stub that exists only so this crate type-checks
//! off-target. Task entry points are never invoked by the host test suite
//! (see `sys/kern::startup`), so the stub is never actually reached.

use abi::Sysnum;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "arm")] {
        use core::arch::asm;

        pub fn syscall(code: Sysnum, arg1: u32, arg2: u32, buf: &[u8]) -> i32 {
            let rc: i32;
            unsafe {
                asm!(
                    "svc #0",
                    inout("r0") code as u32 => rc,
                    in("r1") arg1,
                    in("r2") arg2,
                    in("r3") buf.as_ptr(),
                    in("r4") buf.len() as u32,
                    options(nostack),
                );
            }
            rc
        }

        pub fn syscall_recv(mailbox: u8, buf: &mut [u8]) -> (i32, u8, u8) {
            let rc: i32;
            let from: u32;
            let len: u32;
            unsafe {
                asm!(
                    "svc #0",
                    inout("r0") Sysnum::ReceiveMsg as u32 => rc,
                    in("r1") mailbox as u32,
                    in("r2") buf.len() as u32,
                    in("r3") buf.as_mut_ptr(),
                    lateout("r1") from,
                    lateout("r2") len,
                    options(nostack),
                );
            }
            (rc, from as u8, len as u8)
        }
    } else {
        pub fn syscall(_code: Sysnum, _arg1: u32, _arg2: u32, _buf: &[u8]) -> i32 {
            unimplemented!("raw syscalls only exist on the target architecture")
        }

        pub fn syscall_recv(_mailbox: u8, _buf: &mut [u8]) -> (i32, u8, u8) {
            unimplemented!("raw syscalls only exist on the target architecture")
        }
    }
}
