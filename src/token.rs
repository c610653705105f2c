// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The user-facing, awaitable handle to a job.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::job::{JobErased, JobRef, RawJob};
use crate::scheduler::Scheduler;
use crate::state::JobState;

/// An awaitable handle to a spawned job.
///
/// `Token<T>` (with the default `DEFERRED = false`) dispatches eagerly: on
/// a worker thread it runs inline up to its first suspension point before
/// `spawn` returns; from any other thread it is simply enqueued.
/// [`DeferredToken<T>`] never runs anything until it is first polled or
/// explicitly [launched](DeferredToken::launch).
pub struct Token<T, const DEFERRED: bool = false> {
    erased: JobRef,
    take_result: Arc<dyn Fn() -> Option<T> + Send + Sync>,
    scheduler: Scheduler,
    dispatched: AtomicBool,
}

/// A [`Token`] that does not self-schedule at construction time.
pub type DeferredToken<T> = Token<T, true>;

impl<T, const DEFERRED: bool> Token<T, DEFERRED>
where
    T: Send + 'static,
{
    /// Wraps `future` as a job bound to `scheduler`.
    ///
    /// For an eager token this dispatches immediately; for a deferred token
    /// nothing runs until the token is awaited or [launched](DeferredToken::launch).
    #[track_caller]
    pub fn spawn<F>(scheduler: &Scheduler, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let span = tracing::trace_span!(
            "job",
            job.output = %std::any::type_name::<T>(),
            job.deferred = DEFERRED,
        );
        let job = RawJob::new(future, span);
        let erased: JobRef = job.clone();
        let take_result: Arc<dyn Fn() -> Option<T> + Send + Sync> =
            Arc::new(move || job.take_result());

        let token = Self {
            erased,
            take_result,
            scheduler: scheduler.clone(),
            dispatched: AtomicBool::new(false),
        };

        if !DEFERRED {
            token.dispatch();
        }

        token
    }

    pub(crate) fn header(&self) -> &crate::header::Header {
        self.erased.header()
    }

    /// The scheduler this token's job is bound to.
    pub(crate) fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    /// `true` if this token's state has reached `Done`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.header().state() == JobState::Done
    }

    /// Marks the job canceled.
    ///
    /// Cancellation is advisory: it does not interrupt a poll already in
    /// progress and does not propagate to any jobs this one may itself have
    /// spawned. A canceled job wakes its parent (if any) but never produces
    /// a value; awaiting it directly after cancellation is a programmer
    /// error, while [`Task::result`](crate::task_handle::Task::result)
    /// surfaces it as [`Error::Canceled`](crate::error::Error::Canceled).
    pub fn cancel(&self) {
        self.header().cancel();
    }

    /// Dispatches the job if it has not been dispatched yet.
    ///
    /// Idempotent: calling this more than once (or racing it against the
    /// first poll) only dispatches the job once.
    fn dispatch(&self) {
        if self.dispatched.swap(true, Ordering::AcqRel) {
            return;
        }

        let header = self.header();
        assert!(
            header.set_executor(&self.scheduler),
            "job is already bound to a different scheduler"
        );

        match crate::scheduler::current() {
            Some(current) if current.is_same(&self.scheduler) => {
                // Already running on one of this scheduler's workers: poll
                // inline instead of round-tripping through the shared
                // queue. `poll_job` itself forces the `Processing`
                // transition.
                self.erased.clone().poll_job();
            }
            _ => {
                header.force_state(JobState::Scheduled);
                self.scheduler.reschedule(self.erased.clone());
            }
        }
    }
}

impl<T> DeferredToken<T>
where
    T: Send + 'static,
{
    /// Dispatches a deferred token's job now, if it has not started yet.
    ///
    /// Idempotent.
    pub fn launch(&self) {
        self.dispatch();
    }
}

impl<T, const DEFERRED: bool> Future for Token<T, DEFERRED>
where
    T: Send + 'static,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();

        if DEFERRED {
            this.dispatch();
        }

        let header = this.header();

        if header.state() == JobState::Done {
            if let Some(value) = (this.take_result)() {
                return Poll::Ready(value);
            }
        }

        if header.set_continuation(cx.waker().clone()) {
            Poll::Pending
        } else {
            // The job reached `Closed` concurrently with our registration
            // attempt; it will never wake us, so read the result directly
            // instead of suspending.
            let value = (this.take_result)()
                .expect("job finished (or was canceled) without producing a result");
            Poll::Ready(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn eager_token_on_non_worker_thread_runs_after_spawn_returns() {
        let scheduler = Scheduler::new(1);
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();

        let token = Token::<()>::spawn(&scheduler, async move {
            r.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.block_on(token);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }

    #[test]
    fn deferred_token_does_not_run_until_launched() {
        let scheduler = Scheduler::new(1);
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();

        let token = DeferredToken::<()>::spawn(&scheduler, async move {
            r.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        scheduler.block_on(token);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }

    #[test]
    fn token_result_roundtrips() {
        let scheduler = Scheduler::new(2);
        let token = Token::<i32>::spawn(&scheduler, async { 42 });
        let value = scheduler.block_on(token);
        assert_eq!(value, 42);
        scheduler.shutdown();
    }
}
