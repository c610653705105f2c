// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A builder for constructing a [`Scheduler`] with an explicit worker count
//! and thread naming, modeled on the same builder-pattern ergonomics used
//! for configuring individual jobs.

use crate::error::Error;
use crate::scheduler::Scheduler;

/// Configures and constructs a [`Scheduler`].
#[derive(Debug)]
pub struct SchedulerBuilder<'a> {
    worker_count: Option<usize>,
    thread_name_prefix: &'a str,
}

impl<'a> SchedulerBuilder<'a> {
    /// Starts from the default configuration: one worker per available
    /// core, threads named `coschedule-worker-<n>`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            worker_count: None,
            thread_name_prefix: "coschedule-worker",
        }
    }

    /// Overrides the number of worker threads. Must be nonzero at
    /// [`build`](Self::build) time.
    #[must_use]
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Overrides the prefix used to name worker threads (`"<prefix>-<n>"`).
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: &'a str) -> Self {
        self.thread_name_prefix = prefix;
        self
    }

    /// Builds the scheduler, spawning its worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoWorkers`] if the configured worker count is zero.
    pub fn build(self) -> Result<Scheduler, Error> {
        let worker_count = self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        });

        if worker_count == 0 {
            return Err(Error::NoWorkers);
        }

        Ok(Scheduler::with_thread_name(worker_count, self.thread_name_prefix))
    }
}

impl<'a> Default for SchedulerBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_an_error() {
        let result = SchedulerBuilder::new().worker_count(0).build();
        assert!(matches!(result, Err(Error::NoWorkers)));
    }

    #[test]
    fn builds_with_explicit_worker_count() {
        let scheduler = SchedulerBuilder::new()
            .worker_count(2)
            .thread_name_prefix("test-pool")
            .build()
            .unwrap();
        scheduler.shutdown();
    }
}
