// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The per-job control block ("promise"): state, parent linkage, scheduler
//! binding.

use std::sync::OnceLock;
use std::task::Waker;

use crate::id::JobId;
use crate::loom::sync::Mutex;
use crate::loom::sync_ext::atomic::{AtomicU8, Ordering};
use crate::scheduler::Scheduler;
use crate::state::{JobState, ParentStatus};

/// The control block carried inside every job allocation.
///
/// This is the Rust stand-in for the original design's "promise": it tracks
/// the job's lifecycle state, the single scheduler it is bound to, and the
/// parent continuation that must be woken when the job completes.
#[derive(Debug)]
pub struct Header {
    id: JobId,
    state: AtomicU8,
    scheduler: OnceLock<Scheduler>,
    parent_status: AtomicU8,
    parent: Mutex<Option<Waker>>,
    span: tracing::Span,
}

impl Header {
    /// Creates a fresh control block in the `Created` state with no parent
    /// and no scheduler binding.
    pub(crate) fn new(span: tracing::Span) -> Self {
        Self {
            id: JobId::next(),
            state: AtomicU8::new(JobState::Created as u8),
            scheduler: OnceLock::new(),
            parent_status: AtomicU8::new(ParentStatus::Open as u8),
            parent: Mutex::new(None),
            span,
        }
    }

    /// This job's process-unique identifier.
    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The diagnostic span associated with this job for its whole lifetime.
    pub(crate) fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Reads the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Atomically transitions the state from `expected` to `new`.
    ///
    /// Returns `true` on success. Callers must not treat failure as an error
    /// unconditionally — racing transitions (e.g. a wake arriving while a
    /// completion is being recorded) are expected in some call sites.
    pub(crate) fn set_state(&self, expected: JobState, new: JobState) -> bool {
        self.state
            .compare_exchange(
                expected as u8,
                new as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Forces the state, regardless of what it currently is. Used only for
    /// the unconditional `Created -> Scheduled` / `Suspended -> Processing`
    /// dispatch transitions and for `cancel`.
    pub(crate) fn force_state(&self, new: JobState) {
        self.state.store(new as u8, Ordering::Release);
    }

    /// Binds this job to `scheduler`.
    ///
    /// The first call wins. A later call with a *different* scheduler
    /// (compared by identity) returns `false` and the caller must treat that
    /// as a fatal contract violation — jobs never migrate between
    /// schedulers. A later call with the *same* scheduler is a harmless
    /// no-op that also returns `true`.
    pub(crate) fn set_executor(&self, scheduler: &Scheduler) -> bool {
        match self.scheduler.set(scheduler.clone()) {
            Ok(()) => true,
            Err(_) => self
                .scheduler
                .get()
                .is_some_and(|bound| bound.is_same(scheduler)),
        }
    }

    /// The scheduler this job has been bound to, if any.
    pub(crate) fn executor(&self) -> Option<&Scheduler> {
        self.scheduler.get()
    }

    /// Registers `parent` as the continuation to wake when this job
    /// completes.
    ///
    /// Returns `true` if the registration succeeded (the caller is now the
    /// registered parent and should suspend). Returns `false` if the job had
    /// already reached `Closed` by the time this call observed it — the
    /// caller must not suspend and should read the result immediately
    /// instead, since no wakeup will ever arrive.
    pub(crate) fn set_continuation(&self, parent: Waker) -> bool {
        *self.parent.lock().unwrap() = Some(parent);

        match self.parent_status.compare_exchange(
            ParentStatus::Open as u8,
            ParentStatus::Assigned as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(()) => true,
            Err(observed) if ParentStatus::from_u8(observed) == ParentStatus::Closed => {
                // Too late: the child finished concurrently with our attempt
                // to register. Clear what we just stored; nothing will ever
                // read it.
                *self.parent.lock().unwrap() = None;
                false
            }
            Err(_) => unreachable!("set_continuation called twice concurrently"),
        }
    }

    /// Marks this job's parent slot `Closed` and wakes whoever had
    /// registered, if anyone had.
    ///
    /// Called exactly once, from the job's completion path.
    pub(crate) fn schedule_parent(&self) {
        let prior = self.parent_status.swap(ParentStatus::Closed as u8, Ordering::AcqRel);

        if ParentStatus::from_u8(prior) == ParentStatus::Assigned {
            let waker = self.parent.lock().unwrap().take();
            if let Some(waker) = waker {
                waker.wake();
            }
        }
    }

    /// Marks the job `Canceled`, unconditionally.
    ///
    /// Cancellation is advisory only: it does not interrupt an in-flight
    /// poll and does not propagate to children (see the crate-level
    /// documentation for the rationale).
    pub fn cancel(&self) {
        self.state.store(JobState::Canceled as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header::new(tracing::trace_span!("test"))
    }

    #[test]
    fn fresh_header_is_created_and_open() {
        let h = header();
        assert_eq!(h.state(), JobState::Created);
    }

    #[test]
    fn set_continuation_then_schedule_parent_wakes_once() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;
        use std::task::{Wake, Waker};

        struct CountWake(AtomicUsize);
        impl Wake for CountWake {
            fn wake(self: Arc<Self>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let h = header();
        let counter = Arc::new(CountWake(AtomicUsize::new(0)));
        let waker: Waker = Waker::from(counter.clone());

        assert!(h.set_continuation(waker));
        h.schedule_parent();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn schedule_parent_before_registration_rejects_late_continuation() {
        let h = header();
        h.schedule_parent();

        use std::sync::Arc;
        use std::task::{Wake, Waker};
        struct NoopWake;
        impl Wake for NoopWake {
            fn wake(self: Arc<Self>) {}
        }
        let waker: Waker = Waker::from(Arc::new(NoopWake));

        assert!(!h.set_continuation(waker));
    }

    #[cfg(loom)]
    #[test]
    fn parent_handoff_race_wakes_exactly_once() {
        use crate::loom::sync::Arc;
        use crate::loom::sync_ext::atomic::{AtomicUsize, Ordering};
        use crate::loom::{model, thread};
        use std::task::{Wake, Waker};

        struct CountWake(AtomicUsize);
        impl Wake for CountWake {
            fn wake(self: Arc<Self>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        model(|| {
            let h = Arc::new(header());
            let counter = Arc::new(CountWake(AtomicUsize::new(0)));
            let waker: Waker = Waker::from(counter.clone());

            let h1 = h.clone();
            let registrant = thread::spawn(move || h1.set_continuation(waker));

            let h2 = h.clone();
            let completer = thread::spawn(move || h2.schedule_parent());

            let registered = registrant.join().unwrap();
            completer.join().unwrap();

            // Whichever thread reaches `parent_status` first determines the
            // outcome, but exactly one of these must hold: either the
            // registration lost the race (the slot was already `Closed`, so
            // no wake is ever owed and none should fire), or it won and the
            // completer's wake is the only one that fires. Never zero wakes
            // for a successful registration, never more than one either way.
            let wakes = counter.0.load(Ordering::SeqCst);
            if registered {
                assert_eq!(wakes, 1);
            } else {
                assert_eq!(wakes, 0);
            }
        });
    }
}
