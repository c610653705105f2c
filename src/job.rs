// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The scheduler's type-erased view of a suspended future, and the
//! concrete, reference-counted allocation backing it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Wake, Waker};

use crate::header::Header;
use crate::loom::sync::{Arc, Mutex};
use crate::scheduler::Scheduler;
use crate::state::JobState;

/// Outcome of a single `poll_job` call.
///
/// Callers currently only care that the job was polled at all (the run
/// queue doesn't re-enqueue on `Ready`, and self-wakes already reschedule
/// themselves before returning). The distinction is kept because `Pending`
/// and `PendingSchedule` mean genuinely different things for anyone
/// debugging a stuck job: one is parked waiting on an external wake, the
/// other already put itself back on the queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PollResult {
    /// The future completed.
    Ready,
    /// The future returned `Pending` and registered to be woken later.
    Pending,
    /// The future returned `Pending` but rescheduled itself immediately
    /// (e.g. a `yield_now`-style self-wake during its own poll).
    PendingSchedule,
}

/// The stage a job's future is in.
///
/// Modeled as an explicit enum (rather than an `Option<F>` plus a separate
/// "has result" flag) so that the states are mutually exclusive by
/// construction: a job is either still driving its future, holding a
/// finished result nobody has collected yet, or fully drained.
pub(crate) enum Stage<F: Future> {
    Pending(F),
    Ready(F::Output),
    Consumed,
}

/// Object-safe, type-erased handle to a runnable job.
///
/// The scheduler's run queue stores `Arc<dyn JobErased>` so that jobs of
/// arbitrarily different future types can share one queue.
pub(crate) trait JobErased: Send + Sync {
    fn header(&self) -> &Header;

    /// Polls the wrapped future once, driving the job's state machine and
    /// the parent-continuation handoff.
    fn poll_job(self: Arc<Self>) -> PollResult;
}

/// A waker that re-enqueues its job on the scheduler it was bound to when it
/// was dispatched.
///
/// This is the Rust realization of "the scheduler drives jobs forward by
/// re-dispatching them on wake" — the same technique as
/// `std::task::Wake`, applied with a job's own `Arc` as the wake target.
struct JobWaker(Arc<dyn JobErased>);

impl Wake for JobWaker {
    fn wake(self: Arc<Self>) {
        Self::wake_by_ref(&self);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        let job = self.0.clone();
        let header = job.header();

        // Normal case: the job was parked waiting to be woken. Move it back
        // onto the run queue.
        if header.set_state(JobState::Suspended, JobState::Scheduled) {
            if let Some(scheduler) = header.executor() {
                scheduler.reschedule(job);
            }
            return;
        }

        // The wake arrived while the job is still being polled (a self-wake,
        // or a racing external wake that beat the poll to completion). Flag
        // it `Scheduled` directly; `poll_job`'s own `Processing -> Suspended`
        // transition will then fail, and it reschedules itself instead of
        // going to sleep on a wakeup that already happened.
        header.set_state(JobState::Processing, JobState::Scheduled);
    }
}

/// A concrete job allocation wrapping a user future `F`.
pub(crate) struct RawJob<F: Future> {
    header: Header,
    stage: Mutex<Stage<F>>,
}

impl<F> RawJob<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    pub(crate) fn new(future: F, span: tracing::Span) -> Arc<Self> {
        Arc::new(Self {
            header: Header::new(span),
            stage: Mutex::new(Stage::Pending(future)),
        })
    }
}

impl<F> JobErased for RawJob<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn header(&self) -> &Header {
        &self.header
    }

    fn poll_job(self: Arc<Self>) -> PollResult {
        let _span = self.header.span().enter();

        if self.header.state() == JobState::Canceled {
            // Wake any registered parent so it does not wait forever for a
            // value that will never arrive; `Token::poll` surfaces the
            // absence of a result as a hard error when it observes this.
            self.header.schedule_parent();
            return PollResult::Ready;
        }

        self.header.force_state(JobState::Processing);

        let waker: Waker = Waker::from(Arc::new(JobWaker(self.clone())));
        let mut cx = Context::from_waker(&waker);

        let poll = {
            let mut stage = self.stage.lock().unwrap();
            match &mut *stage {
                Stage::Pending(fut) => {
                    // Safety: `fut` lives inside `self.stage`, which is only
                    // ever accessed while holding this lock, and the `Arc`
                    // keeps the allocation (and thus `fut`) alive for as
                    // long as this pinned borrow exists.
                    let fut = unsafe { Pin::new_unchecked(fut) };
                    fut.poll(&mut cx)
                }
                Stage::Ready(_) | Stage::Consumed => {
                    unreachable!("poll_job called on an already-completed job")
                }
            }
        };

        match poll {
            Poll::Ready(value) => {
                *self.stage.lock().unwrap() = Stage::Ready(value);
                self.header.schedule_parent();
                self.header.force_state(JobState::Done);
                tracing::trace!(job = %self.header.id(), "job completed");
                PollResult::Ready
            }
            Poll::Pending => {
                if self.header.set_state(JobState::Processing, JobState::Suspended) {
                    tracing::trace!(job = %self.header.id(), "job suspended");
                    PollResult::Pending
                } else {
                    // A wake raced us and already flipped the state to
                    // `Scheduled` (see `JobWaker::wake_by_ref`). Pick the job
                    // back up immediately rather than stranding it.
                    tracing::trace!(job = %self.header.id(), "job woke itself during poll");
                    if let Some(scheduler) = self.header.executor() {
                        scheduler.reschedule(self.clone());
                    }
                    PollResult::PendingSchedule
                }
            }
        }
    }
}

impl<F> RawJob<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    /// Takes the completed value out, if the job has finished and nobody has
    /// collected it yet.
    pub(crate) fn take_result(&self) -> Option<F::Output> {
        let mut stage = self.stage.lock().unwrap();
        if matches!(&*stage, Stage::Ready(_)) {
            let taken = std::mem::replace(&mut *stage, Stage::Consumed);
            match taken {
                Stage::Ready(value) => Some(value),
                _ => unreachable!(),
            }
        } else {
            None
        }
    }
}

pub(crate) type JobRef = Arc<dyn JobErased>;
