//! Limiter stress tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use task_limiter::Limiter;
use tokio::time::sleep;

use super::{ConcurrencyTracker, get_memory_usage_mb};

/// Test: Thousands of queued submissions
#[tokio::test]
#[ignore]
async fn stress_large_backlog() {
    let tracker = ConcurrencyTracker::new();
    let processed = Arc::new(AtomicUsize::new(0));
    let limiter = Limiter::new(10);

    let start = Instant::now();

    // Queue 1000 tasks with capacity 10
    for _ in 0..1000 {
        let tracker = Arc::clone(&tracker);
        let processed = Arc::clone(&processed);
        limiter.submit(async move {
            tracker.enter();
            sleep(Duration::from_millis(10)).await;
            processed.fetch_add(1, Ordering::Relaxed);
            tracker.exit();
        });
    }

    limiter.join().await;

    let duration = start.elapsed();
    println!("Processed 1000 tasks in {:?}", duration);
    println!("Peak concurrency: {}", tracker.peak());

    assert_eq!(processed.load(Ordering::Relaxed), 1000);
    assert!(tracker.peak() <= 10);
    // 100 waves of ~10ms each
    assert!(duration >= Duration::from_millis(900));
}

/// Test: One hundred thousand tiny tasks
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_high_volume() {
    let limiter = Limiter::new(64);
    let processed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    for _ in 0..100_000 {
        let processed = Arc::clone(&processed);
        limiter.submit(async move {
            processed.fetch_add(1, Ordering::Relaxed);
        });
    }

    limiter.join().await;

    let duration = start.elapsed();
    println!("100k tasks in {:?}", duration);
    println!(
        "Throughput: {:.0} tasks/sec",
        100_000.0 / duration.as_secs_f64()
    );

    assert_eq!(processed.load(Ordering::Relaxed), 100_000);
    assert_eq!(limiter.available_slots(), 64);
}

/// Test: Many submit/join rounds on one limiter
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_many_rounds() {
    let limiter = Limiter::new(16);
    let processed = Arc::new(AtomicUsize::new(0));

    for round in 1..=1000 {
        for _ in 0..50 {
            let processed = Arc::clone(&processed);
            limiter.submit(async move {
                tokio::task::yield_now().await;
                processed.fetch_add(1, Ordering::Relaxed);
            });
        }
        limiter.join().await;
        assert_eq!(processed.load(Ordering::Relaxed), round * 50);
    }

    assert_eq!(limiter.outstanding(), 0);
}

/// Test: Manual acquire/release contention across many tasks
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_manual_contention() {
    let limiter = Limiter::new(4);
    let tracker = ConcurrencyTracker::new();

    let mut handles = vec![];
    for _ in 0..500 {
        let limiter = limiter.clone();
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                limiter.acquire().await;
                tracker.enter();
                tokio::task::yield_now().await;
                tracker.exit();
                limiter.release();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("Peak concurrency: {}", tracker.peak());
    assert!(tracker.peak() <= 4);
    assert_eq!(limiter.available_slots(), 4);
}

/// Test: Memory stays flat across repeated large backlogs
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_memory_stability() {
    let limiter = Limiter::new(32);
    let initial_memory = get_memory_usage_mb();

    for _ in 0..20 {
        for _ in 0..10_000 {
            limiter.submit(async {
                tokio::task::yield_now().await;
            });
        }
        limiter.join().await;
    }

    let final_memory = get_memory_usage_mb();
    let growth = final_memory - initial_memory;
    println!(
        "Memory: {:.2} MB -> {:.2} MB (growth {:.2} MB)",
        initial_memory, final_memory, growth
    );

    assert_eq!(limiter.outstanding(), 0);
    if initial_memory > 0.0 {
        assert!(growth < 100.0, "Memory grew by {:.2} MB", growth);
    }
}
