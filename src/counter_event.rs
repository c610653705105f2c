// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A single-consumer counting event: an atomic counter that wakes its one
//! registered waiter once it reaches zero.

use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::loom::sync::Mutex;
use crate::loom::sync_ext::atomic::{AtomicIsize, Ordering};
use crate::scheduler::Scheduler;

/// An atomic counter with a single attached waker.
///
/// Only one outstanding waiter is supported at a time, matching the single
/// consumer restriction of the primitive this is modeled on. Registering a
/// second waker while one is already registered simply replaces it rather
/// than silently dropping the earlier waiter's wakeup, since [`Waker`] is
/// cheaply cloneable and safely overwritable.
#[derive(Debug)]
pub struct CounterEvent {
    count: AtomicIsize,
    waiter: Mutex<Option<Waker>>,
}

impl CounterEvent {
    /// Creates a counter event that becomes ready once `target` decrements
    /// have been issued (or, for `target <= 0`, is ready immediately).
    #[must_use]
    pub fn new(target: isize) -> Self {
        Self {
            count: AtomicIsize::new(target),
            waiter: Mutex::new(None),
        }
    }

    /// Decrements the counter by `n`, waking the registered waiter if the
    /// counter has reached (or already was at) zero or below.
    pub fn decrement(&self, n: isize) {
        let prev = self.count.fetch_sub(n, Ordering::AcqRel);
        if prev - n <= 0 {
            if let Some(waker) = self.waiter.lock().unwrap().take() {
                waker.wake();
            }
        }
    }

    /// Non-blocking check of whether the counter has reached zero or below.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.count.load(Ordering::Acquire) <= 0
    }

    /// Cooperative poll used by [`Future`] implementations: registers `cx`'s
    /// waker if not yet ready, re-checking afterward to close the race
    /// against a concurrent `decrement`.
    pub(crate) fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_ready() {
            return Poll::Ready(());
        }
        *self.waiter.lock().unwrap() = Some(cx.waker().clone());
        if self.is_ready() {
            return Poll::Ready(());
        }
        Poll::Pending
    }

    /// Blocks the calling thread until the counter reaches zero.
    ///
    /// This drives the same poll loop as `.await` would, through
    /// [`Scheduler::block_on`] on whichever scheduler the calling thread
    /// belongs to (or the global scheduler if called from outside any worker
    /// pool) — the temporary-worker technique: the calling thread joins the
    /// dispatch loop rather than idling a worker slot.
    pub fn wait(&self) {
        let scheduler = crate::scheduler::current().unwrap_or_else(Scheduler::global);
        scheduler.block_on(self);
    }
}

impl Future for &CounterEvent {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.get_mut().poll_ready(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_target_is_immediately_ready() {
        let ev = CounterEvent::new(0);
        assert!(ev.is_ready());
    }

    #[test]
    fn becomes_ready_after_exact_decrements() {
        let ev = CounterEvent::new(3);
        ev.decrement(1);
        assert!(!ev.is_ready());
        ev.decrement(1);
        assert!(!ev.is_ready());
        ev.decrement(1);
        assert!(ev.is_ready());
    }

    #[test]
    fn wakes_registered_waiter_exactly_once() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;
        use std::task::Wake;

        struct CountWake(AtomicUsize);
        impl Wake for CountWake {
            fn wake(self: Arc<Self>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let ev = CounterEvent::new(1);
        let counter = Arc::new(CountWake(AtomicUsize::new(0)));
        let waker: Waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);

        let mut pinned = &ev;
        assert_eq!(Pin::new(&mut pinned).poll(&mut cx), Poll::Pending);

        ev.decrement(1);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
