// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Composition primitives built on top of [`Token`]/[`CounterEvent`]:
//! running a set of jobs concurrently, or one after another.

use std::sync::Arc;

use crate::counter_event::CounterEvent;
use crate::scheduler::Scheduler;
use crate::token::DeferredToken;

/// Runs every job in `jobs` concurrently and completes once all of them
/// have finished.
///
/// An empty `jobs` list resolves immediately: the internal counter starts
/// already at zero, and the returned token never needs to suspend.
#[must_use]
pub fn parallel_for(scheduler: &Scheduler, jobs: Vec<DeferredToken<()>>) -> DeferredToken<()> {
    let remaining = Arc::new(CounterEvent::new(jobs.len() as isize));

    for job in jobs {
        let remaining = remaining.clone();
        let watcher = DeferredToken::<()>::spawn(scheduler, async move {
            job.await;
            remaining.decrement(1);
        });
        watcher.launch();
    }

    DeferredToken::<()>::spawn(scheduler, async move {
        (&*remaining).await;
    })
}

/// Runs every job in `jobs` one after another, in the order given, and
/// completes once the last one has finished.
///
/// An empty `jobs` list resolves immediately, symmetrically with
/// [`parallel_for`].
#[must_use]
pub fn sequential_for(scheduler: &Scheduler, jobs: Vec<DeferredToken<()>>) -> DeferredToken<()> {
    DeferredToken::<()>::spawn(scheduler, async move {
        for job in jobs {
            job.await;
        }
    })
}
