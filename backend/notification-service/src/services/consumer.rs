//! Notification consumer group.
//!
//! Derives a notification from each event, resolves the recipient, persists
//! the row, then forwards it to the push gateway best-effort. Self-triggered
//! events (actor is the recipient) are suppressed before any row is written;
//! their ranking and audit effects happen in other consumer groups and are
//! unaffected.

use async_trait::async_trait;
use event_bus::{ConsumeError, EventHandler};
use event_schema::{EventEnvelope, EventKind, QueueName};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{NotificationDraft, NotificationKind, PushMessage};
use crate::services::notification_service::NotificationService;
use crate::services::push::PushGateway;

pub const CONSUMER_GROUP: &str = "notification-consumer";

/// Build the notification draft for an envelope.
///
/// `content_owner` is the resolved owner of the envelope's content, for the
/// kinds whose recipient is the owner. Returns `Ok(None)` when no
/// notification should exist: self-triggered events, kinds outside this
/// group, or content that no longer has an owner.
pub fn build_draft(
    envelope: &EventEnvelope,
    content_owner: Option<Uuid>,
) -> Result<Option<NotificationDraft>, ConsumeError> {
    let actor = envelope.actor_user_id;

    let draft = match envelope.event_type {
        EventKind::ContentLike | EventKind::ContentFavorite | EventKind::CommentCreated => {
            let content_id = envelope
                .content_id()
                .ok_or_else(|| ConsumeError::malformed("notification event without content_id"))?;
            let Some(owner) = content_owner else {
                debug!(%content_id, "content has no owner, dropping notification");
                return Ok(None);
            };

            let (kind, body) = match envelope.event_type {
                EventKind::ContentLike => (NotificationKind::Like, "liked your content".to_string()),
                EventKind::ContentFavorite => (
                    NotificationKind::Favorite,
                    "added your content to favorites".to_string(),
                ),
                _ => (
                    NotificationKind::Comment,
                    match envelope.text() {
                        Some(text) => format!("commented on your content: {text}"),
                        None => "commented on your content".to_string(),
                    },
                ),
            };

            NotificationDraft {
                recipient_id: owner,
                sender_id: Some(actor),
                kind,
                content_id: Some(content_id),
                comment_id: envelope.comment_id(),
                body,
            }
        }
        EventKind::UserFollowed => {
            let followed = envelope.followed_user_id().ok_or_else(|| {
                ConsumeError::malformed("follow event without followed_user_id")
            })?;

            NotificationDraft {
                recipient_id: followed,
                sender_id: Some(actor),
                kind: NotificationKind::Follow,
                content_id: None,
                comment_id: None,
                body: "started following you".to_string(),
            }
        }
        // Moderation outcomes notify the uploader; these are
        // system-originated, so there is no sender.
        EventKind::ContentApproved => NotificationDraft {
            recipient_id: actor,
            sender_id: None,
            kind: NotificationKind::ContentApproved,
            content_id: envelope.content_id(),
            comment_id: None,
            body: "your content passed review and is now visible".to_string(),
        },
        EventKind::ContentRejected => NotificationDraft {
            recipient_id: actor,
            sender_id: None,
            kind: NotificationKind::ContentRejected,
            content_id: envelope.content_id(),
            comment_id: None,
            body: match envelope.payload.get("reason").and_then(|v| v.as_str()) {
                Some(reason) => format!("your content did not pass review: {reason}"),
                None => "your content did not pass review".to_string(),
            },
        },
        _ => {
            debug!(event_type = %envelope.event_type, "not a notification event");
            return Ok(None);
        }
    };

    // Never notify users about their own actions.
    if draft.sender_id == Some(draft.recipient_id) {
        debug!(
            event_id = %envelope.event_id,
            "self-triggered event, suppressing notification"
        );
        return Ok(None);
    }

    Ok(Some(draft))
}

pub struct NotificationEventHandler {
    service: Arc<NotificationService>,
    push: Arc<dyn PushGateway>,
}

impl NotificationEventHandler {
    pub fn new(service: Arc<NotificationService>, push: Arc<dyn PushGateway>) -> Self {
        Self { service, push }
    }

    fn needs_owner(kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::ContentLike | EventKind::ContentFavorite | EventKind::CommentCreated
        )
    }
}

#[async_trait]
impl EventHandler for NotificationEventHandler {
    fn queue(&self) -> QueueName {
        QueueName::Notification
    }

    fn consumer_group(&self) -> &'static str {
        CONSUMER_GROUP
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), ConsumeError> {
        let owner = if Self::needs_owner(envelope.event_type) {
            let content_id = envelope
                .content_id()
                .ok_or_else(|| ConsumeError::malformed("notification event without content_id"))?;
            self.service
                .content_owner(content_id)
                .await
                .map_err(ConsumeError::failed)?
        } else {
            None
        };

        let Some(draft) = build_draft(envelope, owner)? else {
            return Ok(());
        };

        let notification = self
            .service
            .create_notification(draft)
            .await
            .map_err(ConsumeError::failed)?;

        // Push is best-effort; the row above is the durable record.
        let message = PushMessage::from_notification(&notification);
        if let Err(e) = self
            .push
            .push_to_user(notification.recipient_id, &message)
            .await
        {
            warn!(
                notification_id = %notification.id,
                recipient_id = %notification.recipient_id,
                "push delivery failed (not retried): {e:#}"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_schema::content_payload;

    fn like_envelope(actor: Uuid, content: Uuid) -> EventEnvelope {
        EventEnvelope::new(EventKind::ContentLike, actor, content_payload(content))
    }

    #[test]
    fn like_notifies_the_content_owner() {
        let actor = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let content = Uuid::new_v4();

        let draft = build_draft(&like_envelope(actor, content), Some(owner))
            .unwrap()
            .expect("draft expected");

        assert_eq!(draft.recipient_id, owner);
        assert_eq!(draft.sender_id, Some(actor));
        assert_eq!(draft.kind, NotificationKind::Like);
        assert_eq!(draft.content_id, Some(content));
    }

    #[test]
    fn own_like_is_suppressed() {
        let owner = Uuid::new_v4();
        let draft = build_draft(&like_envelope(owner, Uuid::new_v4()), Some(owner)).unwrap();
        assert!(draft.is_none(), "self-notification must be suppressed");
    }

    #[test]
    fn deleted_content_produces_no_notification() {
        let draft = build_draft(&like_envelope(Uuid::new_v4(), Uuid::new_v4()), None).unwrap();
        assert!(draft.is_none());
    }

    #[test]
    fn missing_content_id_is_malformed() {
        let envelope = EventEnvelope::new(
            EventKind::ContentLike,
            Uuid::new_v4(),
            serde_json::Map::new(),
        );
        let err = build_draft(&envelope, Some(Uuid::new_v4())).unwrap_err();
        assert!(!err.is_retryable(), "malformed payloads are never retried");
    }

    #[test]
    fn comment_body_carries_the_comment_text() {
        let actor = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let mut payload = content_payload(Uuid::new_v4());
        payload.insert("comment_id".into(), serde_json::json!(Uuid::new_v4()));
        payload.insert("text".into(), serde_json::json!("nice one"));

        let envelope = EventEnvelope::new(EventKind::CommentCreated, actor, payload);
        let draft = build_draft(&envelope, Some(owner)).unwrap().unwrap();

        assert_eq!(draft.kind, NotificationKind::Comment);
        assert!(draft.body.contains("nice one"));
        assert!(draft.comment_id.is_some());
    }

    #[test]
    fn follow_notifies_the_followed_user() {
        let follower = Uuid::new_v4();
        let followed = Uuid::new_v4();
        let mut payload = serde_json::Map::new();
        payload.insert("followed_user_id".into(), serde_json::json!(followed));

        let envelope = EventEnvelope::new(EventKind::UserFollowed, follower, payload);
        let draft = build_draft(&envelope, None).unwrap().unwrap();

        assert_eq!(draft.recipient_id, followed);
        assert_eq!(draft.sender_id, Some(follower));
        assert_eq!(draft.kind, NotificationKind::Follow);
    }

    #[test]
    fn self_follow_is_suppressed() {
        let user = Uuid::new_v4();
        let mut payload = serde_json::Map::new();
        payload.insert("followed_user_id".into(), serde_json::json!(user));

        let envelope = EventEnvelope::new(EventKind::UserFollowed, user, payload);
        assert!(build_draft(&envelope, None).unwrap().is_none());
    }

    #[test]
    fn moderation_outcomes_notify_the_uploader_without_a_sender() {
        let uploader = Uuid::new_v4();
        let mut payload = content_payload(Uuid::new_v4());
        payload.insert("reason".into(), serde_json::json!("duplicate upload"));

        let envelope = EventEnvelope::new(EventKind::ContentRejected, uploader, payload);
        let draft = build_draft(&envelope, None).unwrap().unwrap();

        // Recipient equals the envelope actor here, but the notification is
        // system-originated (no sender), so suppression does not apply.
        assert_eq!(draft.recipient_id, uploader);
        assert_eq!(draft.sender_id, None);
        assert_eq!(draft.kind, NotificationKind::ContentRejected);
        assert!(draft.body.contains("duplicate upload"));
    }

    #[test]
    fn audit_only_kinds_produce_no_draft() {
        let envelope = EventEnvelope::new(
            EventKind::UserRegistered,
            Uuid::new_v4(),
            serde_json::Map::new(),
        );
        assert!(build_draft(&envelope, None).unwrap().is_none());
    }
}
