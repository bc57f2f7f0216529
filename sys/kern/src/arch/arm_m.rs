// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cortex-M trap and interrupt glue.
//!
//! The SVC handler decodes the caller's kernel-call record and hands it to
//! [`crate::syscalls::dispatch`]; the SysTick handler advances the tick and
//! raises PendSV; PendSV performs the actual context switch, which is the
//! only place this kernel runs two different stacks through one function.
//!
//! # Why PendSV at all
//!
//! `SVCall` does a full save/restore around every trap because almost every
//! syscall this ABI has is a point where the running task can change
//! (`RECEIVEMSG` blocks, `SENDMSG` can promote a higher-priority receiver).
//! `SysTick` usually does *not* change who's running — only when it ticks a
//! task off the end of its slice or wakes a timed-out waiter — so it defers
//! the actual save/restore dance to `PendSV`, which only runs when a switch
//! is really needed.
//!
//! # Register convention
//!
//! Every task stack carries the same 17-word shape whenever it isn't
//! actually running: eight callee-saved registers (`r4`-`r11`) and `lr`,
//! pushed by software, directly below the eight words (`r0`-`r3`, `r12`,
//! `lr`, `pc`, `xpsr`) the hardware itself pushes on exception entry. `arch`
//! never interprets a task's stack any other way, whether that stack was
//! shaped by a real trap or manufactured by [`init_stack`] for a task that
//! has never run.

use core::arch::global_asm;
use core::convert::TryFrom;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::kernel::MAX_TASKS;
use crate::startup::{with_kernel, TaskDesc};
use crate::syscalls::{dispatch, CallArgs};
use crate::task::{NextTask, RecvResult};
use abi::{retcode, Sysnum, MSG_MAX};

static CLOCK_FREQ: AtomicU32 = AtomicU32::new(0);

pub fn set_clock_freq(f: u32) {
    CLOCK_FREQ.store(f, Ordering::Relaxed);
}

pub fn disable_irq() {
    cortex_m::interrupt::disable();
}

pub fn enable_irq() {
    unsafe { cortex_m::interrupt::enable() };
}

pub fn now() -> crate::time::Timestamp {
    // Real implementation reads SysTick's counter alongside a
    // software-maintained tick count; omitted, as clock/tick driver setup
    // is out of scope here.
    0.into()
}

/// Words per task stack. Generous for tasks whose state is a handful of
/// `u8`/`u32` fields and a 32-byte message buffer.
const STACK_WORDS: usize = 256;

/// `r4`-`r11` plus `lr`, saved by software on every trap.
const SAVED_WORDS: usize = 9;
/// `r0`-`r3`, `r12`, `lr`, `pc`, `xpsr`, saved by hardware on every trap.
const HW_WORDS: usize = 8;
const FRAME_WORDS: usize = SAVED_WORDS + HW_WORDS;

/// Return-to-Thread-mode-on-PSP, no floating-point frame. Every task's `lr`
/// slots hold this once it's taken (or been given) a real trap.
const EXC_RETURN: u32 = 0xFFFF_FFFD;
/// Thumb-state bit only; this ABI never hands a task a fabricated `xpsr`
/// with anything else set.
const INITIAL_XPSR: u32 = 0x0100_0000;

static mut STACKS: [[u32; STACK_WORDS]; MAX_TASKS] = [[0; STACK_WORDS]; MAX_TASKS];

/// Saved stack pointer for every task slot, indexed the same way
/// `Kernel::tasks` is. Points at the low end of the task's `SAVED_WORDS`
/// block; the hardware frame follows immediately above it.
static mut TASK_PSP: [u32; MAX_TASKS] = [0; MAX_TASKS];

/// Task id currently running (or, inside a trap handler, the one that just
/// trapped).
static CURRENT: AtomicU8 = AtomicU8::new(0);

/// Builds a task's stack as though it had already been saved once, so the
/// same restore path `SVCall`/`PendSV` use for an ordinary resume also
/// boots a task that's never run.
fn init_stack(tid: u8, entry: fn() -> !) {
    unsafe {
        let base = STACKS[tid as usize].as_mut_ptr();
        let frame = base.add(STACK_WORDS - FRAME_WORDS);
        for i in 0..8 {
            *frame.add(i) = 0; // r4-r11: no prior locals to resume into
        }
        *frame.add(8) = EXC_RETURN; // lr (manual slot)
        let hw = frame.add(SAVED_WORDS);
        *hw.add(0) = 0; // r0
        *hw.add(1) = 0; // r1
        *hw.add(2) = 0; // r2
        *hw.add(3) = 0; // r3
        *hw.add(4) = 0; // r12
        *hw.add(5) = EXC_RETURN; // lr (hw slot): task entries are `fn() -> !`
        *hw.add(6) = entry as usize as u32; // pc
        *hw.add(7) = INITIAL_XPSR;
        TASK_PSP[tid as usize] = frame as u32;
    }
}

/// Copies one completed receive's result into `tid`'s own stacked frame,
/// for a task resumed some time after its `RECEIVEMSG` blocked. No-op if
/// nothing resolved it yet (an ordinary pre-emption, not a wake-up).
fn resume_pending_recv(tid: u8) {
    if let Some(r) = with_kernel(|k| k.take_recv_result(tid)) {
        unsafe {
            patch_frame(TASK_PSP[tid as usize], retcode::SUCCESS, Some(r));
        }
    }
}

/// Writes a dispatch result into the stacked frame at `psp`: the return
/// code into `r0`, and — if this is a `RECEIVEMSG` completion — the sender
/// into `r1`, the length into `r2`, and the payload into the caller's
/// buffer at the address its own `r3` still holds.
unsafe fn patch_frame(psp: u32, rc: i32, recv: Option<RecvResult>) {
    let hw = (psp as *mut u32).add(SAVED_WORDS);
    *hw.add(0) = rc as u32;
    if let Some(r) = recv {
        *hw.add(1) = r.from as u32;
        *hw.add(2) = r.len as u32;
        let buf_ptr = *hw.add(3) as *mut u8;
        core::ptr::copy_nonoverlapping(r.payload.as_ptr(), buf_ptr, r.len as usize);
    }
}

/// Builds every task's initial stack, picks whichever one the scheduler
/// says should run first, and jumps to it. Never returns.
///
/// # Safety
/// May be called exactly once, after the task table has been fully
/// initialized.
pub unsafe fn start_first_task(tasks: &'static [TaskDesc], tick_divisor: u32) -> ! {
    set_clock_freq(tick_divisor);
    for t in tasks {
        init_stack(t.id, t.entry);
    }
    let first = with_kernel(|k| k.current()).expect("task table must not be empty");
    CURRENT.store(first, Ordering::Relaxed);
    first_task_trampoline(TASK_PSP[first as usize])
}

extern "C" {
    fn first_task_trampoline(psp: u32) -> !;
}

global_asm! {"
    .section .text.first_task_trampoline
    .globl first_task_trampoline
    .type first_task_trampoline,function
    first_task_trampoline:
        @ r0 is the new task's saved stack pointer, pointing at its
        @ manufactured r4-r11+lr block; the hw frame follows right above it.
        @ There's no active exception to `bx`-return out of here (this is a
        @ plain function call from kernel startup), so thread mode is
        @ switched onto PSP directly instead, then the entry point is
        @ branched to as an ordinary call.
        msr PSP, r0
        ldm r0!, {{r4-r11, lr}}
        movs r1, #3
        msr CONTROL, r1
        isb
        ldr r1, [r0, #24]
        bx r1
"}

#[no_mangle]
unsafe extern "C" fn svc_rust_handler(psp: u32) -> u32 {
    let caller = CURRENT.load(Ordering::Relaxed);
    TASK_PSP[caller as usize] = psp;

    let hw = (psp as *const u32).add(SAVED_WORDS);
    let code = *hw;
    let arg1 = *hw.add(1);
    let arg2 = *hw.add(2);
    let user_buf = *hw.add(3);
    let buf_len_reg = *(psp as *const u32); // manually-saved r4

    let call = match Sysnum::try_from(code) {
        Ok(c) => c,
        Err(()) => {
            patch_frame(psp, retcode::DEFAULT_FAIL, None);
            return psp;
        }
    };

    let mut args = CallArgs { arg1, arg2, buf: [0; MSG_MAX], buf_len: 0 };
    if matches!(call, Sysnum::SendMsg) {
        let len = (buf_len_reg as usize).min(MSG_MAX);
        core::ptr::copy_nonoverlapping(user_buf as *const u8, args.buf.as_mut_ptr(), len);
        args.buf_len = len as u8;
    }

    let result = with_kernel(|k| dispatch(k, caller, call, args));

    // A `RECEIVEMSG` that just blocked has no result to write yet: its
    // caller isn't resuming now, and writing a premature `r0` here would
    // only be overwritten anyway once `resume_pending_recv` fires later.
    let blocked_on_recv =
        matches!(call, Sysnum::ReceiveMsg) && result.recv.is_none() && result.next == NextTask::Other;
    if !blocked_on_recv {
        patch_frame(psp, result.rc, result.recv);
    }

    let next_tid = if result.next == NextTask::Other {
        with_kernel(|k| k.current()).expect("task table must not be empty")
    } else {
        caller
    };
    if next_tid != caller {
        resume_pending_recv(next_tid);
    }
    CURRENT.store(next_tid, Ordering::Relaxed);
    TASK_PSP[next_tid as usize]
}

global_asm! {"
    .section .text.SVCall
    .globl SVCall
    .type SVCall,function
    SVCall:
        mrs r0, PSP
        stmdb r0!, {{r4-r11, lr}}
        bl svc_rust_handler
        ldm r0!, {{r4-r11, lr}}
        msr PSP, r0
        bx lr
"}

#[no_mangle]
unsafe extern "C" fn pendsv_switch(psp: u32) -> u32 {
    let current = CURRENT.load(Ordering::Relaxed);
    TASK_PSP[current as usize] = psp;
    let next_tid = with_kernel(|k| k.current()).expect("task table must not be empty");
    if next_tid != current {
        resume_pending_recv(next_tid);
    }
    CURRENT.store(next_tid, Ordering::Relaxed);
    TASK_PSP[next_tid as usize]
}

global_asm! {"
    .section .text.PendSV
    .globl PendSV
    .type PendSV,function
    PendSV:
        mrs r0, PSP
        stmdb r0!, {{r4-r11, lr}}
        bl pendsv_switch
        ldm r0!, {{r4-r11, lr}}
        msr PSP, r0
        bx lr
"}

#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    with_kernel(|k| {
        k.tick();
        k.drain_events();
    });
    cortex_m::peripheral::SCB::set_pendsv();
}
