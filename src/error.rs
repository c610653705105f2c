// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Recoverable error conditions exposed at the public API boundary.
//!
//! Protocol violations (double executor binding, polling a job from two
//! workers at once) are programmer errors and `panic!` at the point of
//! detection instead of appearing here.

use thiserror::Error;

/// Errors returned from the scheduler's public API.
#[derive(Debug, Error)]
pub enum Error {
    /// A [`SchedulerBuilder`](crate::builder::SchedulerBuilder) was asked to
    /// build a scheduler with zero worker threads.
    #[error("a scheduler needs at least one worker thread")]
    NoWorkers,

    /// A job was awaited or its result retrieved after it had been
    /// [cancelled](crate::header::Header::cancel) rather than completed.
    #[error("job was canceled before it produced a result")]
    Canceled,
}
