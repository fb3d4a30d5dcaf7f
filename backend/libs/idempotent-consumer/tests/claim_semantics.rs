//! Claim semantics against a live Redis.
//!
//! Run with: docker run --rm -p 6379:6379 redis:7
//! Then: cargo test -p idempotent-consumer -- --ignored

use idempotent_consumer::IdempotencyGuard;
use std::time::Duration;
use uuid::Uuid;

async fn connect() -> redis_utils::SharedConnectionManager {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
    redis_utils::RedisPool::connect(&url)
        .await
        .expect("redis must be running for ignored tests")
        .manager()
}

#[tokio::test]
#[ignore = "requires Redis running"]
async fn first_claim_wins_subsequent_claims_lose() {
    let guard = IdempotencyGuard::new(connect().await, Duration::from_secs(60));
    let event_id = Uuid::new_v4();

    assert!(guard.try_claim(event_id, "test-group").await);
    assert!(!guard.try_claim(event_id, "test-group").await);
    assert!(!guard.try_claim(event_id, "test-group").await);
}

#[tokio::test]
#[ignore = "requires Redis running"]
async fn groups_claim_independently() {
    let guard = IdempotencyGuard::new(connect().await, Duration::from_secs(60));
    let event_id = Uuid::new_v4();

    assert!(guard.try_claim(event_id, "ranking-consumer").await);
    assert!(guard.try_claim(event_id, "notification-consumer").await);
    assert!(!guard.try_claim(event_id, "ranking-consumer").await);
}

#[tokio::test]
#[ignore = "requires Redis running"]
async fn exactly_one_concurrent_claimant_succeeds() {
    let guard = IdempotencyGuard::new(connect().await, Duration::from_secs(60));
    let event_id = Uuid::new_v4();

    let attempts = (0..16).map(|_| {
        let guard = guard.clone();
        tokio::spawn(async move { guard.try_claim(event_id, "test-group").await })
    });

    let mut winners = 0;
    for handle in attempts {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "SET NX must admit exactly one claimant");
}

#[tokio::test]
#[ignore = "requires Redis running"]
async fn claim_reopens_after_ttl_expiry() {
    let guard = IdempotencyGuard::new(connect().await, Duration::from_secs(1));
    let event_id = Uuid::new_v4();

    assert!(guard.try_claim(event_id, "test-group").await);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    // Past the window the marker has expired; a late duplicate claims again.
    // This is the documented drift window for non-idempotent effects.
    assert!(guard.try_claim(event_id, "test-group").await);
}
