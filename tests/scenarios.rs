// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end scenarios exercising the scheduler through its public API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use coschedule::{parallel_for, sequential_for, DeferredTask, DeferredToken, Scheduler, Task, Token};

#[test]
fn s1_empty_parallel_for_completes_immediately() {
    let scheduler = Scheduler::new(2);
    let token = parallel_for(&scheduler, vec![]);
    scheduler.block_on(token);
    scheduler.shutdown();
}

#[test]
fn s2_parallel_for_of_three_trivial_jobs() {
    let scheduler = Scheduler::new(4);
    let count = Arc::new(AtomicUsize::new(0));

    let jobs: Vec<_> = (0..3)
        .map(|_| {
            let count = count.clone();
            DeferredToken::<()>::spawn(&scheduler, async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    let token = parallel_for(&scheduler, jobs);
    scheduler.block_on(token);

    assert_eq!(count.load(Ordering::SeqCst), 3);
    scheduler.shutdown();
}

#[test]
fn s3_sequential_for_preserves_order() {
    let scheduler = Scheduler::new(4);
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let jobs: Vec<_> = (0..3)
        .map(|i| {
            let order = order.clone();
            DeferredToken::<()>::spawn(&scheduler, async move {
                order.lock().unwrap().push(i);
            })
        })
        .collect();

    let token = sequential_for(&scheduler, jobs);
    scheduler.block_on(token);

    assert_eq!(&*order.lock().unwrap(), &[0, 1, 2]);
    scheduler.shutdown();
}

#[test]
fn s4_producer_consumer_terminates() {
    const TARGET: usize = 100;

    let scheduler = Scheduler::new(4);
    let produced = Arc::new(AtomicUsize::new(0));
    let consumed = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..10)
        .map(|_| {
            let produced = produced.clone();
            let done = done.clone();
            DeferredToken::<()>::spawn(&scheduler, async move {
                while !done.load(Ordering::Acquire) {
                    produced.fetch_add(1, Ordering::Relaxed);
                    coschedule_yield().await;
                }
            })
        })
        .collect();

    let consumer = {
        let consumed = consumed.clone();
        let done = done.clone();
        DeferredToken::<()>::spawn(&scheduler, async move {
            while consumed.fetch_add(1, Ordering::Relaxed) + 1 < TARGET {
                coschedule_yield().await;
            }
            done.store(true, Ordering::Release);
        })
    };

    let mut all = producers;
    all.push(consumer);

    let token = parallel_for(&scheduler, all);
    scheduler.block_on(token);

    assert!(done.load(Ordering::Acquire));
    assert_eq!(consumed.load(Ordering::Acquire), TARGET);
    scheduler.shutdown();
}

/// A future that yields control back to the scheduler exactly once, used by
/// tests that need cooperative jobs to interleave instead of running to
/// completion in a single poll.
fn coschedule_yield() -> impl std::future::Future<Output = ()> {
    struct Yield(bool);
    impl std::future::Future for Yield {
        type Output = ();
        fn poll(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<()> {
            if self.0 {
                std::task::Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                std::task::Poll::Pending
            }
        }
    }
    Yield(false)
}

#[test]
fn s5_counter_event_single_consumer() {
    use coschedule::CounterEvent;

    let scheduler = Scheduler::new(4);
    let counter = Arc::new(CounterEvent::new(5));

    let jobs: Vec<_> = (0..5)
        .map(|_| {
            let counter = counter.clone();
            DeferredToken::<()>::spawn(&scheduler, async move {
                counter.decrement(1);
            })
        })
        .collect();

    let token = parallel_for(&scheduler, jobs);
    scheduler.block_on(token);

    assert!(counter.is_ready());
    scheduler.shutdown();
}

#[test]
fn s6_task_i32_result_is_42() {
    let scheduler = Scheduler::new(2);
    let task = Task::<i32>::spawn(&scheduler, async { 42 });
    assert_eq!(task.result().unwrap(), 42);
    scheduler.shutdown();
}

#[test]
fn s7_empty_sequential_for_completes_immediately() {
    let scheduler = Scheduler::new(2);
    let token = sequential_for(&scheduler, vec![]);
    scheduler.block_on(token);
    scheduler.shutdown();
}

#[test]
fn s8_single_worker_does_not_deadlock() {
    use coschedule::CounterEvent;

    let scheduler = Scheduler::new(1);
    let counter = Arc::new(CounterEvent::new(1));

    let c = counter.clone();
    let _decrementer = Token::<()>::spawn(&scheduler, async move {
        c.decrement(1);
    });

    // Block the test thread (not a pool worker) on the counter event via
    // the same scheduler the decrementer was submitted to; the temporary
    // worker mechanism must keep draining the queue until it observes the
    // counter reach zero, whether or not the dedicated worker thread beats
    // it to the job.
    scheduler.block_on(&*counter);
    assert!(counter.is_ready());

    scheduler.shutdown();
}

/// Property: every job frame allocated while running a tree of jobs is
/// eventually freed. A `DropGuard` moved into each leaf job's future
/// increments a shared counter on creation and decrements it on `Drop`;
/// since the guard is only ever referenced from inside the future it wraps,
/// the counter returning to zero after the whole tree completes means the
/// scheduler never held on to a finished job's frame.
#[test]
fn no_frame_leaks_across_a_tree_of_jobs() {
    struct DropGuard(Arc<AtomicUsize>);

    impl Drop for DropGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    let alive = Arc::new(AtomicUsize::new(0));
    let scheduler = Scheduler::new(4);

    let parents: Vec<_> = (0..5)
        .map(|_| {
            let alive = alive.clone();
            let scheduler = scheduler.clone();
            DeferredToken::<()>::spawn(&scheduler, async move {
                let children: Vec<_> = (0..4)
                    .map(|_| {
                        alive.fetch_add(1, Ordering::SeqCst);
                        let guard = DropGuard(alive.clone());
                        DeferredToken::<()>::spawn(&scheduler, async move {
                            let _guard = guard;
                        })
                    })
                    .collect();
                parallel_for(&scheduler, children).await;
            })
        })
        .collect();

    scheduler.block_on(parallel_for(&scheduler, parents));

    assert_eq!(alive.load(Ordering::SeqCst), 0, "a leaf job's frame outlived its completion");
    scheduler.shutdown();
}

/// Property: no two workers ever observe the same job `Processing`
/// simultaneously. Each spawned job's future bumps a reentrancy guard on
/// entry and drops it on exit, failing loudly the moment a second poll
/// overlaps a first; this is exercised many times over a multi-worker
/// scheduler with a job that yields mid-poll, so a real double-dispatch
/// would have ample opportunity to show up as a panic rather than pass
/// silently.
#[test]
fn no_double_resume_under_concurrent_workers() {
    const JOBS: usize = 200;

    let scheduler = Scheduler::new(8);

    let jobs: Vec<_> = (0..JOBS)
        .map(|_| {
            let in_poll = AtomicBool::new(false);
            DeferredToken::<()>::spawn(&scheduler, async move {
                assert!(
                    !in_poll.swap(true, Ordering::AcqRel),
                    "job observed Processing from two pollers at once"
                );
                coschedule_yield().await;
                assert!(
                    in_poll.swap(false, Ordering::AcqRel),
                    "reentrancy guard was cleared by someone else"
                );
            })
        })
        .collect();

    scheduler.block_on(parallel_for(&scheduler, jobs));
    scheduler.shutdown();
}

#[test]
fn deferred_task_launch_is_idempotent() {
    let scheduler = Scheduler::new(2);
    let ran = Arc::new(AtomicUsize::new(0));
    let r = ran.clone();

    let task = DeferredTask::<()>::spawn(&scheduler, async move {
        r.fetch_add(1, Ordering::SeqCst);
    });

    task.launch();
    task.launch();
    task.result().unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    scheduler.shutdown();
}
