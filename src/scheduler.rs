// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The fixed worker pool that dispatches jobs, plus the temporary-worker
//! technique used to drive a job to completion from a thread outside the
//! pool without deadlocking it.

use std::cell::RefCell;
use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::task::{Context, Poll, Wake, Waker};
use std::thread::JoinHandle;

use crate::job::JobRef;
use crate::queue::ClosableQueue;
use crate::state::JobState;

thread_local! {
    static CURRENT: RefCell<Option<Scheduler>> = const { RefCell::new(None) };
}

/// Returns the scheduler owning the worker thread this call runs on, or
/// `None` if the calling thread is not (currently) a worker or temporary
/// worker of any scheduler.
pub(crate) fn current() -> Option<Scheduler> {
    CURRENT.with(|c| c.borrow().clone())
}

struct Inner {
    queue: ClosableQueue<JobRef>,
    running: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// An owned, explicitly constructed handle to a fixed pool of worker
/// threads.
///
/// `Scheduler` is cheap to clone (it is a thin `Arc` wrapper); every clone
/// refers to the same pool. Unlike a process-wide singleton, a `Scheduler`
/// is created and torn down explicitly — see [`Scheduler::shutdown`].
#[derive(Clone, Debug)]
pub struct Scheduler(Arc<Inner>);

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("queued", &self.queue.len())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl Scheduler {
    /// Creates a scheduler with `worker_count` dedicated worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` is zero. Use
    /// [`SchedulerBuilder`](crate::builder::SchedulerBuilder) for a
    /// fallible constructor.
    #[must_use]
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count > 0, "a scheduler needs at least one worker thread");
        Self::with_thread_name(worker_count, "coschedule-worker")
    }

    pub(crate) fn with_thread_name(worker_count: usize, name_prefix: &str) -> Self {
        let inner = Arc::new(Inner {
            queue: ClosableQueue::new(),
            running: AtomicBool::new(true),
            workers: Mutex::new(Vec::with_capacity(worker_count)),
        });
        let scheduler = Scheduler(inner);

        let mut workers = scheduler.0.workers.lock().unwrap();
        for id in 0..worker_count {
            let worker_scheduler = scheduler.clone();
            let handle = std::thread::Builder::new()
                .name(format!("{name_prefix}-{id}"))
                .spawn(move || worker_scheduler.run_worker(id))
                .expect("failed to spawn scheduler worker thread");
            workers.push(handle);
        }
        drop(workers);

        scheduler
    }

    /// A lazily constructed, process-wide default scheduler sized to the
    /// number of available cores.
    ///
    /// Unlike the original design's singleton, construction here goes
    /// through [`OnceLock`], which makes the "is it already constructed"
    /// check race-free rather than a hand-rolled double-checked lock.
    #[must_use]
    pub fn global() -> Scheduler {
        static GLOBAL: OnceLock<Scheduler> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                let workers = std::thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(1);
                Scheduler::with_thread_name(workers, "coschedule-global")
            })
            .clone()
    }

    /// Identity comparison: two `Scheduler` handles refer to the same pool
    /// iff they share the same underlying allocation.
    #[must_use]
    pub(crate) fn is_same(&self, other: &Scheduler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Binds `job` to this scheduler (if not already bound) and enqueues it.
    ///
    /// # Panics
    ///
    /// Panics if `job` is already bound to a *different* scheduler — jobs
    /// never migrate between pools.
    pub(crate) fn schedule(&self, job: JobRef) {
        let header = job.header();
        assert!(
            header.set_executor(self),
            "job is already bound to a different scheduler"
        );
        header.force_state(JobState::Scheduled);
        self.enqueue(job);
    }

    /// Re-enqueues a job that is already bound to this scheduler and already
    /// in the `Scheduled` state (used by wakeups).
    pub(crate) fn reschedule(&self, job: JobRef) {
        self.enqueue(job);
    }

    fn enqueue(&self, job: JobRef) {
        if self.0.queue.enqueue(job).is_err() {
            tracing::warn!("scheduler is shutting down; dropping a job that was about to run");
        }
    }

    fn run_worker(self, id: usize) {
        let _span = tracing::info_span!("scheduler worker", worker = id).entered();
        CURRENT.with(|c| *c.borrow_mut() = Some(self.clone()));
        tracing::debug!("worker started");

        loop {
            if let Some(job) = self.0.queue.dequeue() {
                job.poll_job();
                continue;
            }

            if !self.0.running.load(Ordering::Acquire) {
                break;
            }

            std::thread::yield_now();
        }

        tracing::debug!("worker stopped");
    }

    /// Drives `fut` to completion on the calling thread, which joins the
    /// dispatch loop as a temporary, extra worker for as long as `fut` is
    /// pending.
    ///
    /// This is what lets a synchronous caller — the program's `main`
    /// thread, or a single-worker pool whose one worker is itself blocked —
    /// wait on a job's result without deadlocking: rather than idling, the
    /// calling thread keeps draining and running whatever else is on the
    /// shared queue until the thing it is actually waiting for becomes
    /// ready.
    pub(crate) fn block_on<F: Future>(&self, fut: F) -> F::Output {
        let previous = CURRENT.with(|c| c.replace(Some(self.clone())));

        let waker: Waker = Waker::from(Arc::new(NoopWake));
        let mut cx = Context::from_waker(&waker);
        let mut fut = pin!(fut);

        let result = loop {
            if let Poll::Ready(value) = fut.as_mut().poll(&mut cx) {
                break value;
            }

            if let Some(job) = self.0.queue.dequeue() {
                job.poll_job();
            } else {
                std::thread::yield_now();
            }
        };

        CURRENT.with(|c| *c.borrow_mut() = previous);
        result
    }

    /// Stops accepting new dispatch, drains any jobs still waiting in the
    /// queue (they are dropped, never polled — callers that need different
    /// behavior should stop enqueuing before calling this), and joins every
    /// worker thread.
    ///
    /// Returns the number of jobs that were drained unstarted.
    pub fn shutdown(&self) -> usize {
        self.0.running.store(false, Ordering::Release);
        let drained = self.0.queue.close_and_flush();

        let mut workers = self.0.workers.lock().unwrap();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }

        drained.len()
    }
}

/// A waker that does nothing.
///
/// Used as the outer context for [`Scheduler::block_on`]: the calling thread
/// does not wait to be woken by this waker, it simply keeps re-polling in a
/// loop while also draining the shared queue, so no actual wakeup delivery
/// is required for correctness.
struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
    fn wake_by_ref(self: &Arc<Self>) {}
}
