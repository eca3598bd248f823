// tests/task_queue.rs
mod common;
use crate::common::{init_tracing, lanes, with_timeout, TestResult};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::{sleep, timeout, Duration};

use monorun::engine::TaskQueue;
use monorun::errors::TaskError;

/// Shared in-flight gauge for instrumented operations.
#[derive(Default)]
struct Gauge {
    now: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.now.fetch_sub(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn submit_settles_with_the_operation_result() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(2));
    let handle = queue.submit(21u32, |n| async move { Ok(n * 2) });

    assert_eq!(with_timeout(handle).await?, 42);
    Ok(())
}

#[tokio::test]
async fn jobs_of_different_types_share_one_queue() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(1));
    let text = queue.submit("web", |name: &'static str| async move { Ok(format!("{name}!")) });
    let number = queue.submit(vec![1, 2, 3], |v: Vec<i32>| async move { Ok(v.len()) });

    assert_eq!(with_timeout(text).await?, "web!");
    assert_eq!(with_timeout(number).await?, 3);
    Ok(())
}

#[tokio::test]
async fn run_all_preserves_input_order_when_completion_order_differs() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(4));
    let items: Vec<u64> = (0..12).collect();

    // Later items finish first.
    let results = queue
        .run_all(items.clone(), |i| async move {
            sleep(Duration::from_millis((12 - i) * 5)).await;
            Ok(format!("unit-{i}"))
        })
        .await?;

    let expected: Vec<String> = items.iter().map(|i| format!("unit-{i}")).collect();
    assert_eq!(results, expected);
    Ok(())
}

#[tokio::test]
async fn in_flight_never_exceeds_capacity() -> TestResult {
    init_tracing();

    for k in [1usize, 2, 3, 8] {
        let queue = TaskQueue::new(lanes(k));
        let gauge = Arc::new(Gauge::default());

        let op_gauge = Arc::clone(&gauge);
        let results = queue
            .run_all(0..20u64, move |i| {
                let gauge = Arc::clone(&op_gauge);
                async move {
                    gauge.enter();
                    sleep(Duration::from_millis(2 + (i % 4) * 3)).await;
                    gauge.leave();
                    Ok(i)
                }
            })
            .await?;

        assert_eq!(results.len(), 20);
        let max = gauge.max.load(Ordering::SeqCst);
        assert!(max <= k, "K={k} but {max} tasks were in flight");
        assert!(max >= 1);
    }
    Ok(())
}

#[tokio::test]
async fn free_lanes_are_used_to_full_capacity() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(3));
    let gauge = Arc::new(Gauge::default());

    let op_gauge = Arc::clone(&gauge);
    queue
        .run_all(0..9u32, move |_| {
            let gauge = Arc::clone(&op_gauge);
            async move {
                gauge.enter();
                sleep(Duration::from_millis(30)).await;
                gauge.leave();
                Ok(())
            }
        })
        .await?;

    assert_eq!(gauge.max.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn single_lane_starts_tasks_in_submission_order() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(1));
    let started = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&started);
    with_timeout(queue.run_all(0..10u64, move |i| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(i);
            sleep(Duration::from_millis(10 - i)).await;
            Ok(())
        }
    }))
    .await?;

    assert_eq!(*started.lock().unwrap(), (0..10).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn a_failing_task_only_rejects_its_own_handle() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(2));
    let handles = queue.submit_all(0..6u32, |i| async move {
        sleep(Duration::from_millis(5)).await;
        if i == 3 {
            anyhow::bail!("unit {i} is broken");
        }
        Ok(i)
    });

    let mut settled = Vec::new();
    for handle in handles {
        settled.push(with_timeout(handle).await);
    }

    for (i, result) in settled.iter().enumerate() {
        match (i, result) {
            (3, Err(TaskError::Failed(err))) => assert!(err.to_string().contains("unit 3")),
            (3, other) => panic!("expected failure for item 3, got {other:?}"),
            (_, Ok(value)) => assert_eq!(*value as usize, i),
            (_, Err(err)) => panic!("item {i} should have succeeded: {err}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn a_panicking_task_is_contained() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(1));
    let bad = queue.submit((), |_| async move {
        if true {
            panic!("boom");
        }
        Ok(())
    });
    let good = queue.submit(7u8, |n| async move { Ok(n) });

    match with_timeout(bad).await {
        Err(TaskError::Panicked(msg)) => assert!(msg.contains("boom")),
        other => panic!("expected Panicked, got {other:?}"),
    }
    // The lane survived the panic and ran the next job.
    assert_eq!(with_timeout(good).await?, 7);
    Ok(())
}

#[tokio::test]
async fn run_all_fails_fast_while_siblings_keep_running() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(4));
    let finished = Arc::new(AtomicUsize::new(0));

    let done = Arc::clone(&finished);
    let outcome = timeout(
        Duration::from_millis(400),
        queue.run_all(0..4u32, move |i| {
            let done = Arc::clone(&done);
            async move {
                if i == 0 {
                    anyhow::bail!("first unit failed");
                }
                sleep(Duration::from_millis(600)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(i)
            }
        }),
    )
    .await
    .expect("run_all should reject before the slow siblings finish");

    assert!(matches!(outcome, Err(TaskError::Failed(_))));

    // No cancellation: the other three still complete.
    with_timeout(queue.shutdown()).await;
    assert_eq!(finished.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn dropped_handles_do_not_stop_the_job() -> TestResult {
    init_tracing();

    let queue = TaskQueue::new(lanes(1));
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    drop(queue.submit((), move |_| async move {
        sleep(Duration::from_millis(10)).await;
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    with_timeout(queue.shutdown()).await;
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn capacity_reports_the_lane_count() {
    let queue = TaskQueue::new(lanes(5));
    assert_eq!(queue.capacity(), 5);
}
