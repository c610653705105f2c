// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [`Task`]: a [`Token`] that additionally supports blocking on its result
//! from outside the runtime.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::Error;
use crate::scheduler::Scheduler;
use crate::state::JobState;
use crate::token::Token;

/// An awaitable job handle that can also be resolved synchronously via
/// [`result`](Task::result).
///
/// `Task<T>` behaves exactly like [`Token<T>`] when `.await`ed from inside
/// another job. Its only addition is [`result`](Task::result), which joins
/// the scheduler's dispatch loop as a temporary worker (the same mechanism
/// [`CounterEvent::wait`](crate::counter_event::CounterEvent::wait) uses)
/// until the job completes.
pub struct Task<T, const DEFERRED: bool = false>(Token<T, DEFERRED>);

/// A [`Task`] that does not self-schedule at construction time.
pub type DeferredTask<T> = Task<T, true>;

impl<T, const DEFERRED: bool> Task<T, DEFERRED>
where
    T: Send + 'static,
{
    /// Wraps `future` as a job bound to `scheduler`. See [`Token::spawn`]
    /// for the eager/deferred dispatch rules.
    #[track_caller]
    pub fn spawn<F>(scheduler: &Scheduler, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self(Token::spawn(scheduler, future))
    }

    /// `true` if the job has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.is_ready()
    }

    /// Marks the job canceled. See [`Token::cancel`].
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// Blocks the calling thread until the job completes, returning its
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Canceled`] if the job was canceled rather than
    /// completed.
    pub fn result(self) -> Result<T, Error> {
        if self.0.header().state() == JobState::Canceled {
            return Err(Error::Canceled);
        }

        let scheduler = self.0.scheduler();
        Ok(scheduler.block_on(self.0))
    }
}

impl<T> DeferredTask<T>
where
    T: Send + 'static,
{
    /// Dispatches a deferred task's job now, if it has not started yet.
    pub fn launch(&self) {
        self.0.launch();
    }
}

impl<T, const DEFERRED: bool> Future for Task<T, DEFERRED>
where
    T: Send + 'static,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        // `Token` is `Unpin`; project through to it directly.
        let inner = &mut self.get_mut().0;
        Pin::new(inner).poll(cx)
    }
}
