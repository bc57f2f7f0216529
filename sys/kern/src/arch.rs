// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture-specific support.
//!
//! `arm_m` backs a real Cortex-M target; `fake` backs `cargo test` on the
//! host, where there is no MCU to trap into or pre-empt from and the
//! kernel's pure logic ([`crate::kernel`]) is driven directly instead. Both
//! modules present the same small surface so `startup` doesn't need to care
//! which one it's linked against.

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        #[macro_use]
        pub mod arm_m;
        pub use arm_m::*;
    } else {
        pub mod fake;
        pub use fake::*;
    }
}
