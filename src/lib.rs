// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A cooperative coroutine job scheduler.
//!
//! Jobs are ordinary [`std::future::Future`]s, dispatched across a fixed
//! pool of worker threads and wrapped in a [`Token`] (fire-and-forget,
//! awaitable) or [`Task`] (additionally blockable from outside the runtime
//! via [`Task::result`]). Jobs may suspend on one another or on a
//! [`CounterEvent`], and the scheduler preserves parent/child continuation
//! semantics across suspension points via the ordinary [`std::task::Waker`]
//! machinery.
//!
//! ```no_run
//! use coschedule::{Scheduler, Task};
//!
//! let scheduler = Scheduler::new(4);
//! let task = Task::<i32>::spawn(&scheduler, async { 1 + 1 });
//! assert_eq!(task.result().unwrap(), 2);
//! scheduler.shutdown();
//! ```

mod builder;
mod combinators;
mod counter_event;
mod error;
pub mod event;
mod header;
mod id;
mod job;
mod loom;
mod queue;
mod scheduler;
mod state;
mod task_handle;
mod token;

pub use builder::SchedulerBuilder;
pub use combinators::{parallel_for, sequential_for};
pub use counter_event::CounterEvent;
pub use error::Error;
pub use event::Event;
pub use id::JobId;
pub use scheduler::Scheduler;
pub use state::JobState;
pub use task_handle::{DeferredTask, Task};
pub use token::{DeferredToken, Token};
