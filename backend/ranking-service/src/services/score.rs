//! Popularity score computation.
//!
//! The score is a pure function of the current aggregate counters and the
//! current time: a weighted interaction sum damped by exponential time decay
//! since publication. Recomputing with unchanged inputs always yields the
//! same value, and the result is written with an absolute overwrite — which
//! is what makes duplicate recompute triggers harmless.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::config::RankingConfig;
use crate::db::CounterSource;
use crate::error::Result;
use crate::metrics;
use crate::models::ContentCounters;
use crate::services::ranking_store::RankingStore;

/// Weighted interaction sum: plays, likes and comments contribute with the
/// configured weights.
pub fn interaction_score(counters: &ContentCounters, cfg: &RankingConfig) -> f64 {
    counters.play_count as f64 * cfg.play_weight
        + counters.like_count as f64 * cfg.like_weight
        + counters.comment_count as f64 * cfg.comment_weight
}

/// Full score at `now`. Elapsed time is clamped at zero so clock skew around
/// the publish instant never inflates a score.
pub fn compute_score(counters: &ContentCounters, now: DateTime<Utc>, cfg: &RankingConfig) -> f64 {
    let hours_since_publish = (now - counters.published_at)
        .num_seconds()
        .max(0) as f64
        / 3600.0;

    let decay = (-cfg.decay_rate * hours_since_publish).exp();
    interaction_score(counters, cfg) * decay
}

/// Recomputes and stores scores from the counter source of truth.
pub struct ScoreEngine {
    counters: Arc<dyn CounterSource>,
    store: Arc<dyn RankingStore>,
    cfg: RankingConfig,
}

impl ScoreEngine {
    pub fn new(
        counters: Arc<dyn CounterSource>,
        store: Arc<dyn RankingStore>,
        cfg: RankingConfig,
    ) -> Self {
        Self {
            counters,
            store,
            cfg,
        }
    }

    /// Recompute the score for one content item from current counters and
    /// overwrite the stored value. Content that no longer exists is a silent
    /// no-op, not an error.
    pub async fn recompute_score(&self, content_id: Uuid) -> Result<()> {
        let started = Instant::now();

        let counters = match self.counters.get_counters(content_id).await? {
            Some(counters) => counters,
            None => {
                debug!(%content_id, "skipping score recompute for missing content");
                return Ok(());
            }
        };

        let score = compute_score(&counters, Utc::now(), &self.cfg);
        self.store.set_score(content_id, score).await?;

        metrics::observe_recompute(started.elapsed());
        debug!(%content_id, score, "score recomputed");
        Ok(())
    }
}
