use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate counters for one content item, as maintained by the
/// content-metadata collaborator. Read-only from this service; the ranking
/// score is recomputed wholesale from these on every trigger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentCounters {
    pub content_id: Uuid,
    pub play_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub published_at: DateTime<Utc>,
}

/// One page of the trending listing as served over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingPage {
    pub items: Vec<Uuid>,
    pub page: usize,
    pub size: usize,
}
