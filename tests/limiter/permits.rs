use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use task_limiter::{Limiter, LimiterError};
use tokio::time::{sleep, timeout};

/// A second acquire waits for the matching release
#[tokio::test]
async fn acquire_blocks_until_release() {
    let limiter = Limiter::new(1);
    limiter.acquire().await;

    let l = limiter.clone();
    let second = tokio::spawn(async move { l.acquire().await });

    sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished(), "second acquire should still be waiting");

    limiter.release();
    timeout(Duration::from_millis(500), second)
        .await
        .expect("second acquire should return after release")
        .unwrap();

    assert_eq!(limiter.available_slots(), 0);
    limiter.release();
    assert_eq!(limiter.available_slots(), 1);
}

/// A manually held slot keeps submitted tasks waiting
#[tokio::test]
async fn manual_slot_gates_submissions() {
    let limiter = Limiter::new(1);
    let ran = Arc::new(AtomicUsize::new(0));

    limiter.acquire().await;

    let r = Arc::clone(&ran);
    limiter.submit(async move {
        r.fetch_add(1, Ordering::SeqCst);
    });

    sleep(Duration::from_millis(30)).await;
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    limiter.release();
    limiter.join().await;
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

/// Dropping a pending acquire takes nothing from the pool
#[tokio::test]
async fn cancelled_acquire_leaves_pool_untouched() {
    let limiter = Limiter::new(1);
    let held = limiter.acquire_slot().await;

    let l = limiter.clone();
    let pending = tokio::spawn(async move { l.acquire().await });
    sleep(Duration::from_millis(20)).await;
    pending.abort();
    let _ = pending.await;

    assert!(
        timeout(Duration::from_millis(20), limiter.acquire())
            .await
            .is_err()
    );

    drop(held);
    assert_eq!(limiter.available_slots(), 1);
    assert_eq!(limiter.slots_in_use(), 0);
}

/// Bounded waits fail with a timeout and leave the pool as it was
#[tokio::test]
async fn acquire_slot_timeout_expires() {
    let rejected = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&rejected);
    let limiter = Limiter::builder()
        .capacity(1)
        .on_slot_rejected(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let held = limiter.acquire_slot().await;

    let err = limiter
        .acquire_slot_timeout(Duration::from_millis(30))
        .await
        .unwrap_err();
    match err {
        LimiterError::Timeout { waited } => assert!(waited >= Duration::from_millis(30)),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(rejected.load(Ordering::SeqCst), 1);

    drop(held);
    assert_eq!(limiter.available_slots(), 1);

    let slot = limiter
        .acquire_slot_timeout(Duration::from_millis(30))
        .await
        .unwrap();
    assert_eq!(limiter.available_slots(), 0);
    drop(slot);
}

/// A bounded wait succeeds if a slot frees up in time
#[tokio::test]
async fn acquire_slot_timeout_succeeds_after_release() {
    let limiter = Limiter::new(1);
    let held = limiter.acquire_slot().await;

    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        drop(held);
    });

    let slot = limiter
        .acquire_slot_timeout(Duration::from_secs(1))
        .await
        .expect("slot should free up before the deadline");
    drop(slot);
}

/// Guards and bare reservations can be mixed
#[tokio::test]
async fn guard_and_manual_slots_mix() {
    let limiter = Limiter::new(3);

    let a = limiter.acquire_slot().await;
    limiter.acquire().await;
    let b = limiter.try_acquire_slot().unwrap();
    assert_eq!(limiter.slots_in_use(), 3);
    assert!(limiter.try_acquire_slot().is_err());

    drop(a);
    b.forget();
    assert_eq!(limiter.slots_in_use(), 2);

    limiter.release();
    limiter.release();
    assert_eq!(limiter.available_slots(), 3);
}

/// Releasing without acquiring silently grows the pool
#[tokio::test]
async fn unmatched_release_over_grows() {
    let limiter = Limiter::new(1);
    limiter.release();

    let a = limiter.try_acquire_slot().unwrap();
    let b = limiter.try_acquire_slot().unwrap();
    assert_eq!(limiter.available_slots(), 0);
    drop((a, b));
    assert_eq!(limiter.available_slots(), 2);
}
