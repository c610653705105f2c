// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A manual- or auto-reset wait primitive, the idiomatic `Mutex`+`Condvar`
//! stand-in for an OS event handle.
//!
//! This primitive is public API in its own right but has no caller elsewhere
//! in this crate: it blocks a thread until triggered, whereas the scheduler's
//! idle loops and [`crate::counter_event::CounterEvent`] are all built around
//! cooperative polling (`Future::poll` plus a busy-yield between queue
//! drains). The two don't compose — parking a worker thread on a condvar
//! would leave it unable to pick the next job off the queue the moment one
//! arrives.

use std::sync::{Condvar, Mutex};

/// A binary signal that threads can block on.
///
/// A manual-reset `Event` stays triggered until explicitly [`reset`](Event::reset).
/// An auto-reset `Event` clears itself the moment a single waiter observes
/// it triggered, exactly like a Win32 auto-reset event or a POSIX-style
/// single-wakeup condition.
#[derive(Debug)]
pub struct Event {
    manual_reset: bool,
    state: Mutex<bool>,
    condvar: Condvar,
}

impl Event {
    #[must_use]
    pub fn new(manual_reset: bool) -> Self {
        Self {
            manual_reset,
            state: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Sets the event and wakes all current waiters.
    pub fn trigger(&self) {
        *self.state.lock().unwrap() = true;
        self.condvar.notify_all();
    }

    /// Clears the event without waiting.
    pub fn reset(&self) {
        *self.state.lock().unwrap() = false;
    }

    /// Non-blocking probe of the current state.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.state.lock().unwrap()
    }

    /// Blocks the calling thread until the event is triggered.
    ///
    /// For an auto-reset event, this call consumes the trigger: at most one
    /// waiter observes it set before it flips back to clear.
    pub fn wait(&self) {
        let mut guard = self.state.lock().unwrap();
        while !*guard {
            guard = self.condvar.wait(guard).unwrap();
        }
        if !self.manual_reset {
            *guard = false;
        }
    }
}
