//! Per-user interest weights and watch history.
//!
//! Interest weights accumulate by incremental delta per qualifying
//! interaction. Unlike the popularity score, this is not a recompute from a
//! source of truth: a duplicate delivered after the idempotency TTL expires
//! double-applies the delta. The drift is accepted and documented rather
//! than papered over — the weights are captured for future personalization
//! and nothing reads them on the ranking path yet.

use chrono::{DateTime, Utc};
use redis_utils::SharedConnectionManager;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

pub struct InterestStore {
    redis: SharedConnectionManager,
}

impl InterestStore {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }

    fn interest_key(user_id: Uuid) -> String {
        format!("ripple:interest:user:{user_id}")
    }

    fn watch_history_key(user_id: Uuid) -> String {
        format!("ripple:watch:user:{user_id}")
    }

    /// Shift the user's weight for a content item by `delta` (may be
    /// negative, e.g. for an unlike).
    pub async fn apply_delta(&self, user_id: Uuid, content_id: Uuid, delta: f64) -> Result<()> {
        let key = Self::interest_key(user_id);

        redis_utils::with_timeout(async {
            let mut conn = self.redis.lock().await;
            redis::cmd("ZINCRBY")
                .arg(&key)
                .arg(delta)
                .arg(content_id.to_string())
                .query_async::<_, f64>(&mut *conn)
                .await
        })
        .await?;

        debug!(%user_id, %content_id, delta, "interest weight updated");
        Ok(())
    }

    /// Record a play in the user's watch history, scored by event time so
    /// the history reads back in chronological order.
    pub async fn record_watch(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let key = Self::watch_history_key(user_id);

        redis_utils::with_timeout(async {
            let mut conn = self.redis.lock().await;
            redis::cmd("ZADD")
                .arg(&key)
                .arg(at.timestamp_millis())
                .arg(content_id.to_string())
                .query_async::<_, ()>(&mut *conn)
                .await
        })
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_per_user() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(InterestStore::interest_key(a), InterestStore::interest_key(b));
        assert_ne!(
            InterestStore::interest_key(a),
            InterestStore::watch_history_key(a)
        );
    }
}
