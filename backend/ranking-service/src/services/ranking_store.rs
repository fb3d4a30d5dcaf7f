//! Ordered content-id → score structure backing trending reads.

use async_trait::async_trait;
use redis_utils::SharedConnectionManager;
use uuid::Uuid;

use crate::error::Result;

/// Redis key for the global trending sorted set.
pub const TRENDING_KEY: &str = "ripple:trending";

/// Sorted-set semantics over `(content_id, score)`.
///
/// Writes are absolute: `set_score` overwrites whatever was stored before,
/// which is what keeps score recomputation idempotent under duplicate
/// delivery. There is deliberately no increment operation here.
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Absolute overwrite of the score for one content item.
    async fn set_score(&self, content_id: Uuid, score: f64) -> Result<()>;

    /// One page in descending score order, inclusive indices. Ties within
    /// the page resolve by ascending content id so paging is deterministic.
    async fn page_desc(&self, start: usize, stop: usize) -> Result<Vec<Uuid>>;
}

/// Redis sorted-set implementation.
pub struct RedisRankingStore {
    redis: SharedConnectionManager,
}

impl RedisRankingStore {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RankingStore for RedisRankingStore {
    async fn set_score(&self, content_id: Uuid, score: f64) -> Result<()> {
        redis_utils::with_timeout(async {
            let mut conn = self.redis.lock().await;
            redis::cmd("ZADD")
                .arg(TRENDING_KEY)
                .arg(score)
                .arg(content_id.to_string())
                .query_async::<_, ()>(&mut *conn)
                .await
        })
        .await?;

        Ok(())
    }

    async fn page_desc(&self, start: usize, stop: usize) -> Result<Vec<Uuid>> {
        let entries: Vec<(String, f64)> = redis_utils::with_timeout(async {
            let mut conn = self.redis.lock().await;
            redis::cmd("ZREVRANGE")
                .arg(TRENDING_KEY)
                .arg(start as isize)
                .arg(stop as isize)
                .arg("WITHSCORES")
                .query_async(&mut *conn)
                .await
        })
        .await?;

        Ok(order_page(entries))
    }
}

/// Order a fetched page: descending score, ascending content id on ties.
/// Members that fail to parse as uuids are dropped.
pub(crate) fn order_page(entries: Vec<(String, f64)>) -> Vec<Uuid> {
    let mut parsed: Vec<(Uuid, f64)> = entries
        .into_iter()
        .filter_map(|(member, score)| Uuid::parse_str(&member).ok().map(|id| (id, score)))
        .collect();

    parsed.sort_by(|(a_id, a_score), (b_id, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a_id.cmp(b_id))
    });

    parsed.into_iter().map(|(id, _)| id).collect()
}

/// In-memory store for unit tests.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub(crate) struct InMemoryRankingStore {
        scores: RwLock<HashMap<Uuid, f64>>,
    }

    impl InMemoryRankingStore {
        pub(crate) async fn score_of(&self, content_id: Uuid) -> Option<f64> {
            self.scores.read().await.get(&content_id).copied()
        }
    }

    #[async_trait]
    impl RankingStore for InMemoryRankingStore {
        async fn set_score(&self, content_id: Uuid, score: f64) -> Result<()> {
            self.scores.write().await.insert(content_id, score);
            Ok(())
        }

        async fn page_desc(&self, start: usize, stop: usize) -> Result<Vec<Uuid>> {
            let all: Vec<(String, f64)> = self
                .scores
                .read()
                .await
                .iter()
                .map(|(id, score)| (id.to_string(), *score))
                .collect();

            let ordered = order_page(all);
            if start >= ordered.len() {
                return Ok(Vec::new());
            }
            let stop = (stop + 1).min(ordered.len());
            Ok(ordered[start..stop].to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_orders_by_score_descending() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let ordered = order_page(vec![
            (b.to_string(), 10.0),
            (a.to_string(), 30.0),
            (c.to_string(), 20.0),
        ]);

        assert_eq!(ordered, vec![a, c, b]);
    }

    #[test]
    fn equal_scores_break_ties_by_ascending_id() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();

        let ordered = order_page(vec![
            (ids[2].to_string(), 5.0),
            (ids[0].to_string(), 5.0),
            (ids[1].to_string(), 5.0),
        ]);

        assert_eq!(ordered, ids.to_vec());
    }

    #[test]
    fn unparseable_members_are_dropped() {
        let a = Uuid::new_v4();
        let ordered = order_page(vec![
            ("not-a-uuid".to_string(), 99.0),
            (a.to_string(), 1.0),
        ]);
        assert_eq!(ordered, vec![a]);
    }
}
