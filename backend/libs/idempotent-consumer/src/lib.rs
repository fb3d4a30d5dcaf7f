//! # Idempotent Consumer Guard
//!
//! Atomic "claim once" primitive protecting business effects from duplicate
//! event delivery. The broker guarantees at-least-once delivery — redelivery
//! happens on crash, nack, or requeue — so every consumer claims an event
//! before acting on it.
//!
//! ## Contract
//!
//! `try_claim(event_id, consumer_group)` returns `true` exactly once per
//! `(event_id, consumer_group)` pair within the TTL window; every other
//! concurrent or subsequent call returns `false`. Implemented as a single
//! `SET key 1 NX EX ttl` against Redis, so only one claimant can win — there
//! is no read-modify-write to race on.
//!
//! ## Usage
//!
//! ```ignore
//! use idempotent_consumer::IdempotencyGuard;
//! use std::time::Duration;
//!
//! # async fn example(redis: redis_utils::SharedConnectionManager, event_id: uuid::Uuid) {
//! let guard = IdempotencyGuard::new(redis, Duration::from_secs(300));
//!
//! if guard.try_claim(event_id, "ranking-consumer").await {
//!     // first delivery within the window: apply the business effect
//! } else {
//!     // duplicate: acknowledge without reprocessing
//! }
//! # }
//! ```

use redis_utils::SharedConnectionManager;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Atomic claim-once guard over Redis.
#[derive(Clone)]
pub struct IdempotencyGuard {
    redis: SharedConnectionManager,
    ttl: Duration,
}

impl IdempotencyGuard {
    /// Create a guard holding claims for `ttl`.
    pub fn new(redis: SharedConnectionManager, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    /// Claim key for an `(event, consumer group)` pair.
    pub fn claim_key(event_id: Uuid, consumer_group: &str) -> String {
        format!("dedup:event:{consumer_group}:{event_id}")
    }

    /// Attempt to claim the event for this consumer group.
    ///
    /// Returns `true` if this caller won the claim, `false` if the event was
    /// already claimed within the TTL window. A Redis failure logs a warning
    /// and reports the event as unclaimed ("fail open"): under at-least-once
    /// delivery a rare duplicate effect is preferred over dropping events
    /// whenever the guard store blips.
    pub async fn try_claim(&self, event_id: Uuid, consumer_group: &str) -> bool {
        let key = Self::claim_key(event_id, consumer_group);

        let result: Result<Option<String>, _> = redis_utils::with_timeout(async {
            let mut conn = self.redis.lock().await;
            // SET key 1 NX EX ttl — atomic; replies OK when the key was set,
            // nil when it already existed.
            redis::cmd("SET")
                .arg(&key)
                .arg("1")
                .arg("NX")
                .arg("EX")
                .arg(self.ttl.as_secs())
                .query_async(&mut *conn)
                .await
        })
        .await;

        match result {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!(%event_id, consumer_group, "idempotency claim failed, processing anyway: {e}");
                true
            }
        }
    }

    /// Drop a claim so the event can be processed again.
    ///
    /// Used by the consumer harness before dead-lettering: an operator who
    /// later requeues the message from the DLQ must not be blocked by a
    /// claim held by the failed attempt.
    pub async fn release(&self, event_id: Uuid, consumer_group: &str) {
        let key = Self::claim_key(event_id, consumer_group);

        let result: Result<(), _> = redis_utils::with_timeout(async {
            let mut conn = self.redis.lock().await;
            redis::cmd("DEL").arg(&key).query_async(&mut *conn).await
        })
        .await;

        if let Err(e) = result {
            warn!(%event_id, consumer_group, "failed to release idempotency claim: {e}");
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_key_scopes_by_consumer_group() {
        let event_id = Uuid::new_v4();
        let ranking = IdempotencyGuard::claim_key(event_id, "ranking-consumer");
        let audit = IdempotencyGuard::claim_key(event_id, "audit-consumer");

        assert_ne!(ranking, audit, "groups must claim independently");
        assert!(ranking.contains(&event_id.to_string()));
        assert!(ranking.starts_with("dedup:event:ranking-consumer:"));
    }
}
