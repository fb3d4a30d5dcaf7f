use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Someone liked the recipient's content
    Like,
    /// Someone favorited the recipient's content
    Favorite,
    /// Someone commented on the recipient's content
    Comment,
    /// Someone started following the recipient
    Follow,
    /// The recipient's content passed review
    ContentApproved,
    /// The recipient's content was rejected by review
    ContentRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Favorite => "favorite",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::ContentApproved => "content_approved",
            NotificationKind::ContentRejected => "content_rejected",
        }
    }
}

/// A notification as derived from an envelope, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient_id: Uuid,
    /// Absent for system-originated notifications (moderation outcomes).
    pub sender_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub content_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub body: String,
}

/// Persisted notification row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub kind: String,
    pub content_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload forwarded to the realtime push collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub notification_id: Uuid,
    pub kind: String,
    pub body: String,
    pub content_id: Option<Uuid>,
}

impl PushMessage {
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            notification_id: notification.id,
            kind: notification.kind.clone(),
            body: notification.body.clone(),
            content_id: notification.content_id,
        }
    }
}
