//! End-to-end scheduler scenarios: admission bound, aggregate convergence,
//! concurrent enqueue bursts and delete-all.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::concurrency::ConcurrencyCounter;
use dlq_core::aggregate::AggregateStatus;
use dlq_core::scheduler::Scheduler;
use dlq_core::task::TaskState;
use dlq_core::work::SimulatedTransfer;

fn fast_transfer() -> SimulatedTransfer {
    SimulatedTransfer::new(10, Duration::from_millis(2), Duration::from_millis(5))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_keys_capacity_three_complete_with_bounded_concurrency() {
    let (counted, counters) = ConcurrencyCounter::new(fast_transfer());
    let scheduler = Scheduler::with_work(3, counted);

    let keys: Vec<String> = ('a'..='j').map(|c| c.to_string()).collect();
    assert_eq!(scheduler.enqueue_all(&keys), 10);

    let mut aggregate = scheduler.observe_aggregate();
    let sampler = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let mut max_running = 0;
            loop {
                let running = scheduler.running_count();
                max_running = max_running.max(running);
                let status = scheduler.aggregate();
                assert!(status.succeeded <= status.total);
                if status.is_complete() {
                    return max_running;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    let done = tokio::time::timeout(Duration::from_secs(10), aggregate.wait_until_complete())
        .await
        .expect("all tasks finish")
        .expect("registry alive");
    assert_eq!(
        done,
        AggregateStatus {
            succeeded: 10,
            total: 10
        }
    );

    let max_running = sampler.await.unwrap();
    assert!(max_running <= 3, "observed {max_running} running");
    assert!(counters.max.load(Ordering::SeqCst) <= 3);
    assert_eq!(counters.runs.load(Ordering::SeqCst), 10);
    assert_eq!(scheduler.gate().in_use(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enqueue_of_same_key_admits_once() {
    let (counted, counters) = ConcurrencyCounter::new(fast_transfer());
    let scheduler = Scheduler::with_work(3, counted);

    let mut joins = Vec::new();
    for _ in 0..16 {
        let scheduler = scheduler.clone();
        joins.push(tokio::spawn(async move { scheduler.enqueue("same") }));
    }
    let mut admitted = 0;
    for j in joins {
        if j.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);

    let mut watch = scheduler.observe_status("same");
    tokio::time::timeout(
        Duration::from_secs(5),
        watch.wait_for(|s| s == TaskState::Succeeded),
    )
    .await
    .expect("task finishes");
    assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.registry().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_all_during_burst_leaves_nothing_behind() {
    let (counted, counters) = ConcurrencyCounter::new(SimulatedTransfer::new(
        10,
        Duration::from_millis(20),
        Duration::from_millis(40),
    ));
    let scheduler = Scheduler::with_work(3, counted);
    scheduler.enqueue_all((0..30).map(|i| format!("file-{i}")));
    tokio::time::sleep(Duration::from_millis(50)).await;

    scheduler.delete_all().await;
    assert!(scheduler.registry().is_empty());
    assert_eq!(scheduler.gate().in_use(), 0);
    assert_eq!(scheduler.live_count(), 0);
    assert_eq!(counters.current.load(Ordering::SeqCst), 0);

    // The queue is usable again afterwards.
    assert!(scheduler.enqueue("after"));
    let mut watch = scheduler.observe_status("after");
    tokio::time::timeout(
        Duration::from_secs(5),
        watch.wait_for(|s| s == TaskState::Succeeded),
    )
    .await
    .expect("fresh task finishes");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_right_after_admission_is_never_lost() {
    let scheduler = Scheduler::with_work(1, fast_transfer());

    for round in 0..100 {
        let canceller = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                while scheduler.registry().is_empty() {
                    tokio::task::yield_now().await;
                }
                scheduler.cancel("k").await
            })
        };
        assert!(scheduler.enqueue("k"));

        let cancelled = tokio::time::timeout(Duration::from_secs(5), canceller)
            .await
            .expect("cancel returns")
            .unwrap();
        assert!(cancelled, "round {round}: cancel saw the entry but no task");
        assert_eq!(scheduler.status("k"), TaskState::NotStarted);
        assert_eq!(scheduler.gate().in_use(), 0);
        assert_eq!(scheduler.live_count(), 0);

        scheduler.delete_all().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn enqueue_racing_delete_all_leaves_no_orphan_entries() {
    let scheduler = Scheduler::with_work(2, fast_transfer());

    for _ in 0..50 {
        let enqueuer = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                for i in 0..8 {
                    scheduler.enqueue(format!("k{i}"));
                    tokio::task::yield_now().await;
                }
            })
        };
        scheduler.delete_all().await;
        enqueuer.await.unwrap();
        scheduler.delete_all().await;

        assert!(scheduler.registry().is_empty());
        assert_eq!(scheduler.live_count(), 0);
        assert_eq!(scheduler.gate().in_use(), 0);
    }
}
