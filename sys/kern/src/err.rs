// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling support.
//!
//! Kernel-internal logic returns `Result<T, KernelError>` throughout; the
//! trap dispatcher is the only place that narrows a `KernelError` down to
//! one of the small negative ABI return codes, because which negative
//! number is correct depends on which kernel call failed, not on which
//! `KernelError` variant it was.

pub use abi::KernelError;
use abi::{retcode, Sysnum};

/// Narrows a kernel-internal error to the ABI return code for `call`.
pub fn to_retcode(call: Sysnum, _err: KernelError) -> i32 {
    match call {
        Sysnum::SendMsg => retcode::SEND_FAIL,
        Sysnum::ReceiveMsg => retcode::RECV_FAIL,
        Sysnum::Bind => retcode::BIND_FAIL,
        Sysnum::Unbind => retcode::UNBIND_FAIL,
        _ => retcode::DEFAULT_FAIL,
    }
}
