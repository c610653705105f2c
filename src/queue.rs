// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The shared job queue: a plain mutex-protected FIFO, plus a closable
//! variant used to drain the queue on shutdown.

use std::collections::VecDeque;

use crate::loom::sync::Mutex;
use crate::loom::sync_ext::atomic::{AtomicBool, Ordering};

/// A thread-safe FIFO queue. `dequeue` never blocks; an empty queue yields
/// `None` and the caller decides how to wait.
#[derive(Debug)]
pub(crate) struct SharedQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> SharedQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn enqueue(&self, item: T) {
        self.inner.lock().unwrap().push_back(item);
    }

    pub(crate) fn dequeue(&self) -> Option<T> {
        self.inner.lock().unwrap().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// A [`SharedQueue`] that can be permanently closed, refusing further
/// enqueues and allowing the remaining contents to be drained at once.
///
/// Used by [`Scheduler::shutdown`](crate::scheduler::Scheduler::shutdown) so
/// a shutdown hands back whatever jobs never got to run, instead of silently
/// dropping or leaking them.
#[derive(Debug)]
pub(crate) struct ClosableQueue<T> {
    queue: SharedQueue<T>,
    closed: AtomicBool,
}

impl<T> ClosableQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: SharedQueue::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueues `item` unless the queue has been closed, in which case the
    /// item is handed straight back to the caller.
    pub(crate) fn enqueue(&self, item: T) -> Result<(), T> {
        if self.closed.load(Ordering::Acquire) {
            return Err(item);
        }
        self.queue.enqueue(item);
        Ok(())
    }

    pub(crate) fn dequeue(&self) -> Option<T> {
        self.queue.dequeue()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Closes the queue to further enqueues and drains everything currently
    /// in it.
    pub(crate) fn close_and_flush(&self) -> Vec<T> {
        self.closed.store(true, Ordering::Release);
        let mut drained = Vec::new();
        while let Some(item) = self.queue.dequeue() {
            drained.push(item);
        }
        drained
    }
}
