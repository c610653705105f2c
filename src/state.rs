// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The job lifecycle state machine and the parent-continuation handshake.

/// A job's position in its lifecycle.
///
/// Every [`Header`](crate::header::Header) is born `Created`; `Done` and
/// `Canceled` are terminal and no transition ever leaves them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum JobState {
    /// Allocated, not yet handed to a scheduler.
    Created = 0,
    /// Enqueued on a scheduler's run queue, not yet polled.
    Scheduled = 1,
    /// Currently being polled by exactly one worker.
    Processing = 2,
    /// Polled at least once, returned `Pending`, waiting to be woken.
    Suspended = 3,
    /// The wrapped future returned `Ready`.
    Done = 4,
    /// Canceled before completion; will never reach `Done`.
    Canceled = 5,
}

impl JobState {
    pub(crate) const fn from_u8(v: u8) -> Self {
        match v {
            0 => JobState::Created,
            1 => JobState::Scheduled,
            2 => JobState::Processing,
            3 => JobState::Suspended,
            4 => JobState::Done,
            5 => JobState::Canceled,
            _ => unreachable!("invalid JobState tag"),
        }
    }

    /// `true` for the two states a job never leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Canceled)
    }
}

/// The three-state handshake guarding a job's parent [`Waker`](std::task::Waker).
///
/// This is the crux of the parent/child continuation race: the awaiter's poll
/// path (which wants to register itself) and the child's completion path
/// (which wants to wake whoever registered) race to observe and mutate this
/// tag. It is kept as a genuine three-state machine rather than collapsed to
/// a single boolean, because a boolean cannot distinguish "no one has
/// registered yet" from "someone registered and must be woken" from "it's too
/// late, the child is already gone and the awaiter must not suspend".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ParentStatus {
    /// No parent has registered a continuation yet.
    Open = 0,
    /// A parent registered a continuation; it must be woken on completion.
    Assigned = 1,
    /// The job has completed; no further registration is possible.
    Closed = 2,
}

impl ParentStatus {
    pub(crate) const fn from_u8(v: u8) -> Self {
        match v {
            0 => ParentStatus::Open,
            1 => ParentStatus::Assigned,
            2 => ParentStatus::Closed,
            _ => unreachable!("invalid ParentStatus tag"),
        }
    }
}
