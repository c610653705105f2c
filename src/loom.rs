// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Indirection over `std::sync`/`std::thread` so the concurrency-sensitive
//! parts of this crate can be exercised under `loom` without a second copy.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(loom)] {
        pub(crate) use loom::sync;
        pub(crate) use loom::thread;
        pub(crate) use loom::model;

        pub(crate) mod sync_ext {
            pub(crate) use loom::sync::atomic;
        }
    } else {
        pub(crate) use std::sync;
        pub(crate) use std::thread;

        #[inline(always)]
        pub(crate) fn model<R>(f: impl FnOnce() -> R) -> R {
            f()
        }

        pub(crate) mod sync_ext {
            pub(crate) use std::sync::atomic;
        }
    }
}
