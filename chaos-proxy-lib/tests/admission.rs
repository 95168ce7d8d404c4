use std::time::Duration;

use chaos_proxy_lib::ConnectionLimiter;
use tokio::time::Instant;

#[tokio::test]
async fn permits_free_slots_on_drop() {
    let limiter = ConnectionLimiter::new(2);

    let p1 = limiter.acquire(Duration::from_millis(100)).await;
    let p2 = limiter.acquire(Duration::from_millis(100)).await;
    assert!(p1.is_some());
    assert!(p2.is_some());
    assert_eq!(limiter.current_connections(), 2);

    drop(p1);
    assert_eq!(limiter.current_connections(), 1);

    let p3 = limiter.acquire(Duration::from_millis(100)).await;
    assert!(p3.is_some());
    assert_eq!(limiter.current_connections(), 2);
}

#[tokio::test]
async fn acquire_times_out_when_full() {
    let limiter = ConnectionLimiter::new(1);
    let _held = limiter.acquire(Duration::from_millis(100)).await.unwrap();

    let start = Instant::now();
    let rejected = limiter.acquire(Duration::from_millis(200)).await;
    assert!(rejected.is_none());
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(limiter.rejected_total(), 1);

    let stats = limiter.stats();
    assert_eq!(stats.max_connections, 1);
    assert_eq!(stats.current_connections, 1);
    assert_eq!(stats.available_slots, 0);
    assert_eq!(stats.rejected_total, 1);
    assert!((stats.utilization_percent - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn waiting_acquire_succeeds_when_a_slot_frees() {
    let limiter = std::sync::Arc::new(ConnectionLimiter::new(1));
    let held = limiter.acquire(Duration::from_millis(100)).await.unwrap();

    let waiter = {
        let limiter = limiter.clone();
        tokio::spawn(async move { limiter.acquire(Duration::from_secs(2)).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(held);

    let permit = waiter.await.unwrap();
    assert!(permit.is_some());
    assert_eq!(limiter.rejected_total(), 0);
}
