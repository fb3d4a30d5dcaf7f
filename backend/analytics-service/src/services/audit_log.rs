//! Append-only audit persistence.

use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::ActionLog;

pub struct AuditLogService {
    db: PgPool,
}

impl AuditLogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        actor_user_id: Uuid,
        event_type: &str,
        content_id: Option<Uuid>,
    ) -> Result<ActionLog> {
        let row = sqlx::query_as::<_, ActionLog>(
            r#"
            INSERT INTO action_logs (id, actor_user_id, event_type, content_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, actor_user_id, event_type, content_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor_user_id)
        .bind(event_type)
        .bind(content_id)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        debug!(audit_id = %row.id, event_type, "audit row recorded");
        Ok(row)
    }
}
