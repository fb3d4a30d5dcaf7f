use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only audit row per delivered event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActionLog {
    pub id: Uuid,
    pub actor_user_id: Uuid,
    pub event_type: String,
    pub content_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
