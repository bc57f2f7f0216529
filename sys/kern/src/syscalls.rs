// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The trap dispatcher (component B).
//!
//! A single kernel entry point invoked by the software trap on `arm_m`, or
//! called directly by tests on the host backend. The caller's argument
//! record is `{arg1, arg2, buf, buf_len}`; the ABI return code
//! (`retcode::SUCCESS` or one of the negative failure codes) comes back
//! alongside a switch hint and, for an immediately-satisfied `RECEIVEMSG`,
//! the received payload itself. Exactly one call runs at a time — there is
//! no re-entrancy here, only the possibility that a call ends by switching
//! away from its caller.

use crate::kernel::Kernel;
use crate::task::{NextTask, RecvResult};
use abi::{retcode, KernelError, Priority, Sysnum, MAILBOX_ANY};

/// One kernel-call argument record, as recovered from the caller's saved
/// registers by `arch`.
#[derive(Copy, Clone, Debug)]
pub struct CallArgs {
    pub arg1: u32,
    pub arg2: u32,
    /// Payload for `SENDMSG`, or the receive buffer capacity for
    /// `RECEIVEMSG`; real hardware reaches into user memory for this, the
    /// host backend passes it directly.
    pub buf: [u8; abi::MSG_MAX],
    pub buf_len: u8,
}

/// Result of dispatching one kernel call: the ABI return code, a switch
/// hint, and — for a `RECEIVEMSG` satisfied immediately — the data `arch`
/// must copy back into the caller's registers and buffer before it resumes.
/// `recv` is always `None` for every other call, and for a `RECEIVEMSG`
/// that blocked (`arch` picks that result up later via
/// [`Kernel::take_recv_result`] when the caller is next resumed).
#[derive(Copy, Clone, Debug)]
pub struct DispatchResult {
    pub rc: i32,
    pub next: NextTask,
    pub recv: Option<RecvResult>,
}

impl DispatchResult {
    fn plain(rc: i32, next: NextTask) -> Self {
        DispatchResult { rc, next, recv: None }
    }
}

/// Dispatches one kernel call for `caller` and returns the ABI result and a
/// switch hint. This is the whole of component B: it does no state
/// manipulation itself, only decodes arguments and narrows errors.
pub fn dispatch(kernel: &mut Kernel, caller: u8, call: Sysnum, args: CallArgs) -> DispatchResult {
    match call {
        Sysnum::GetId => DispatchResult::plain(caller as i32, NextTask::Same),
        Sysnum::Nice => {
            if args.arg1 >= abi::PRIORITY_LEVELS as u32 {
                DispatchResult::plain(to_retcode(call, KernelError::InvalidArgument), NextTask::Same)
            } else {
                let next = kernel.nice(caller, Priority(args.arg1 as u8));
                DispatchResult::plain(retcode::SUCCESS, next)
            }
        }
        Sysnum::SendMsg => {
            let dst = args.arg1 as u8;
            let src = args.arg2 as u8;
            match kernel.send(caller, src, dst, &args.buf[..args.buf_len as usize]) {
                Ok(next) => DispatchResult::plain(retcode::SUCCESS, next),
                Err(e) => DispatchResult::plain(to_retcode(call, e), NextTask::Same),
            }
        }
        Sysnum::ReceiveMsg => {
            let mb = args.arg1 as u8;
            let mb = if mb == MAILBOX_ANY { None } else { Some(mb) };
            match kernel.recv(caller, mb, args.arg2 as u8) {
                Ok(Some(result)) => {
                    DispatchResult { rc: retcode::SUCCESS, next: NextTask::Same, recv: Some(result) }
                }
                Ok(None) => DispatchResult::plain(retcode::SUCCESS, NextTask::Other),
                Err(e) => DispatchResult::plain(to_retcode(call, e), NextTask::Same),
            }
        }
        Sysnum::Terminate => {
            kernel.terminate(caller);
            DispatchResult::plain(retcode::SUCCESS, NextTask::Other)
        }
        Sysnum::Bind => {
            let desired = args.arg1 as u8;
            let desired = if desired == MAILBOX_ANY { None } else { Some(desired) };
            match kernel.bind(caller, desired) {
                Ok(id) => DispatchResult::plain(id as i32, NextTask::Same),
                Err(e) => DispatchResult::plain(to_retcode(call, e), NextTask::Same),
            }
        }
        Sysnum::Unbind => match kernel.unbind(caller, args.arg1 as u8) {
            Ok(()) => DispatchResult::plain(retcode::SUCCESS, NextTask::Same),
            Err(e) => DispatchResult::plain(to_retcode(call, e), NextTask::Same),
        },
        Sysnum::Block => {
            kernel.block(caller);
            DispatchResult::plain(retcode::SUCCESS, NextTask::Other)
        }
    }
}

fn to_retcode(call: Sysnum, e: KernelError) -> i32 {
    ringbuf::ringbuf_entry!(RINGBUF, Trace::CallFailed(call, e));
    crate::err::to_retcode(call, e)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    CallFailed(Sysnum, KernelError),
}

ringbuf::ringbuf!(RINGBUF, Trace, 16, Trace::CallFailed(Sysnum::GetId, KernelError::InvalidArgument));

#[cfg(test)]
mod tests {
    use super::*;
    use abi::Priority;

    fn args(arg1: u32, arg2: u32) -> CallArgs {
        CallArgs { arg1, arg2, buf: [0; abi::MSG_MAX], buf_len: 0 }
    }

    fn with_payload(arg1: u32, arg2: u32, payload: &[u8]) -> CallArgs {
        let mut a = args(arg1, arg2);
        a.buf[..payload.len()].copy_from_slice(payload);
        a.buf_len = payload.len() as u8;
        a
    }

    #[test]
    fn getid_returns_caller() {
        let mut k = Kernel::new();
        k.spawn(0, Priority(0));
        k.spawn(3, Priority(1));
        let result = dispatch(&mut k, 3, Sysnum::GetId, args(0, 0));
        assert_eq!(result.rc, 3);
        assert_eq!(result.next, NextTask::Same);
    }

    #[test]
    fn bind_then_send_then_receive_round_trip() {
        let mut k = Kernel::new();
        k.spawn(0, Priority(0));
        k.spawn(1, Priority(1));
        k.spawn(2, Priority(1));
        let mb1 = dispatch(&mut k, 1, Sysnum::Bind, args(3, 0));
        assert_eq!(mb1.rc, 3);
        let mb2 = dispatch(&mut k, 2, Sysnum::Bind, args(5, 0));
        assert_eq!(mb2.rc, 5);
        let result = dispatch(&mut k, 1, Sysnum::ReceiveMsg, args(3, 32));
        assert_eq!(result.rc, retcode::SUCCESS);
        assert_eq!(result.next, NextTask::Other);
        assert!(result.recv.is_none());
        let result = dispatch(&mut k, 2, Sysnum::SendMsg, with_payload(3, 5, b"hi"));
        assert_eq!(result.rc, retcode::SUCCESS);
        let r = k.take_recv_result(1).unwrap();
        assert_eq!(&r.payload[..2], b"hi");
    }

    #[test]
    fn receive_satisfied_immediately_returns_its_payload_in_the_dispatch_result() {
        let mut k = Kernel::new();
        k.spawn(0, Priority(0));
        k.spawn(1, Priority(1));
        let bound = dispatch(&mut k, 1, Sysnum::Bind, args(3, 0));
        assert_eq!(bound.rc, 3);
        let sent = dispatch(&mut k, 0, Sysnum::SendMsg, with_payload(3, 0, b"hi"));
        assert_eq!(sent.rc, retcode::SUCCESS);
        let result = dispatch(&mut k, 1, Sysnum::ReceiveMsg, args(3, 32));
        assert_eq!(result.rc, retcode::SUCCESS);
        let recv = result.recv.expect("immediate receive must carry its payload back");
        assert_eq!(recv.from, 0);
        assert_eq!(&recv.payload[..2], b"hi");
    }

    #[test]
    fn nice_out_of_range_fails() {
        let mut k = Kernel::new();
        k.spawn(0, Priority(0));
        let result = dispatch(&mut k, 0, Sysnum::Nice, args(99, 0));
        assert_eq!(result.rc, retcode::DEFAULT_FAIL);
    }

    #[test]
    fn unbind_unowned_mailbox_fails_with_its_own_code() {
        let mut k = Kernel::new();
        k.spawn(0, Priority(0));
        let result = dispatch(&mut k, 0, Sysnum::Unbind, args(3, 0));
        assert_eq!(result.rc, retcode::UNBIND_FAIL);
    }
}
