//! Notification persistence.

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Notification, NotificationDraft};

pub struct NotificationService {
    db: PgPool,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store a notification. The row is the durable record; push forwarding
    /// afterwards is best-effort.
    pub async fn create_notification(&self, draft: NotificationDraft) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (
                id, recipient_id, sender_id, kind, content_id, comment_id,
                body, is_read, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, false, $8)
            RETURNING id, recipient_id, sender_id, kind, content_id, comment_id,
                      body, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(draft.recipient_id)
        .bind(draft.sender_id)
        .bind(draft.kind.as_str())
        .bind(draft.content_id)
        .bind(draft.comment_id)
        .bind(&draft.body)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        info!(
            notification_id = %notification.id,
            recipient_id = %notification.recipient_id,
            kind = %notification.kind,
            "notification created"
        );
        Ok(notification)
    }

    /// Owner of a content item, from the collaborator's metadata. `None`
    /// when the content is gone.
    pub async fn content_owner(&self, content_id: Uuid) -> Result<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            "SELECT owner_id FROM contents WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(content_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(owner)
    }
}
