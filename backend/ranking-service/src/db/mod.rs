//! Read-only views over collaborator-owned content metadata.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::ContentCounters;

/// Source of aggregate counters and the recency listing.
///
/// Abstracted so the score engine and the read service can be exercised
/// without a live database.
#[async_trait]
pub trait CounterSource: Send + Sync {
    /// Current counters for a content item; `None` when the content no
    /// longer exists (deleted or never published).
    async fn get_counters(&self, content_id: Uuid) -> Result<Option<ContentCounters>>;

    /// Most recently published content ids, newest first. Cold-cache
    /// fallback source for trending reads.
    async fn list_recently_published(&self, offset: i64, limit: i64) -> Result<Vec<Uuid>>;
}

/// Postgres-backed counter source over the collaborator's `contents` table.
pub struct PgCounterSource {
    pool: PgPool,
}

impl PgCounterSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterSource for PgCounterSource {
    async fn get_counters(&self, content_id: Uuid) -> Result<Option<ContentCounters>> {
        let counters = sqlx::query_as::<_, ContentCounters>(
            r#"
            SELECT id AS content_id, play_count, like_count, comment_count, published_at
            FROM contents
            WHERE id = $1 AND status = 'APPROVED' AND deleted_at IS NULL
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(counters)
    }

    async fn list_recently_published(&self, offset: i64, limit: i64) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM contents
            WHERE status = 'APPROVED' AND deleted_at IS NULL
            ORDER BY published_at DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
