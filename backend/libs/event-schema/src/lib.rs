use chrono::{DateTime, Utc};
/// Event schema for the Ripple interaction pipeline.
///
/// Defines the wire shape of every message that crosses the broker: the
/// immutable [`EventEnvelope`], the closed [`EventKind`] enumeration, and the
/// authoritative routing table mapping kinds to destination queues. The
/// routing table lives here — and only here — so the publisher and every
/// consumer agree on which events reach which queue.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod routing;

pub use routing::QueueName;

/// Current schema version for all envelopes.
pub const SCHEMA_VERSION: u32 = 1;

/// Closed enumeration of every event the platform emits.
///
/// Wire names are stable dotted strings; adding a variant is a schema change
/// and must be reflected in the routing table in the same commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    #[serde(rename = "content.play")]
    ContentPlay,
    #[serde(rename = "content.like")]
    ContentLike,
    #[serde(rename = "content.unlike")]
    ContentUnlike,
    #[serde(rename = "content.favorite")]
    ContentFavorite,
    #[serde(rename = "content.share")]
    ContentShare,
    #[serde(rename = "comment.created")]
    CommentCreated,
    #[serde(rename = "comment.deleted")]
    CommentDeleted,
    #[serde(rename = "user.followed")]
    UserFollowed,
    #[serde(rename = "user.unfollowed")]
    UserUnfollowed,
    #[serde(rename = "content.uploaded")]
    ContentUploaded,
    #[serde(rename = "content.approved")]
    ContentApproved,
    #[serde(rename = "content.rejected")]
    ContentRejected,
    #[serde(rename = "content.deleted")]
    ContentDeleted,
    #[serde(rename = "user.registered")]
    UserRegistered,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::ContentPlay,
        EventKind::ContentLike,
        EventKind::ContentUnlike,
        EventKind::ContentFavorite,
        EventKind::ContentShare,
        EventKind::CommentCreated,
        EventKind::CommentDeleted,
        EventKind::UserFollowed,
        EventKind::UserUnfollowed,
        EventKind::ContentUploaded,
        EventKind::ContentApproved,
        EventKind::ContentRejected,
        EventKind::ContentDeleted,
        EventKind::UserRegistered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ContentPlay => "content.play",
            EventKind::ContentLike => "content.like",
            EventKind::ContentUnlike => "content.unlike",
            EventKind::ContentFavorite => "content.favorite",
            EventKind::ContentShare => "content.share",
            EventKind::CommentCreated => "comment.created",
            EventKind::CommentDeleted => "comment.deleted",
            EventKind::UserFollowed => "user.followed",
            EventKind::UserUnfollowed => "user.unfollowed",
            EventKind::ContentUploaded => "content.uploaded",
            EventKind::ContentApproved => "content.approved",
            EventKind::ContentRejected => "content.rejected",
            EventKind::ContentDeleted => "content.deleted",
            EventKind::UserRegistered => "user.registered",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable envelope carried on every queue.
///
/// Created once by the publisher; consumers never mutate it. A consumer that
/// needs to emit a derived event builds a fresh envelope instead. `event_id`
/// is the deduplication key for the idempotency guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: EventKind,
    pub timestamp: DateTime<Utc>,
    pub actor_user_id: Uuid,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Opaque per-kind payload. Typed access goes through the accessor
    /// methods below, which treat malformed values as absent.
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub retry_count: u32,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl EventEnvelope {
    pub fn new(
        event_type: EventKind,
        actor_user_id: Uuid,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            actor_user_id,
            schema_version: SCHEMA_VERSION,
            payload,
            retry_count: 0,
        }
    }

    /// Destination queues for this envelope, from the authoritative table.
    pub fn destinations(&self) -> &'static [QueueName] {
        routing::destinations(self.event_type)
    }

    fn payload_uuid(&self, key: &str) -> Option<Uuid> {
        self.payload
            .get(key)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Content the event refers to, when the payload carries one.
    pub fn content_id(&self) -> Option<Uuid> {
        self.payload_uuid("content_id")
    }

    pub fn comment_id(&self) -> Option<Uuid> {
        self.payload_uuid("comment_id")
    }

    /// Followed user for `user.followed` / `user.unfollowed`.
    pub fn followed_user_id(&self) -> Option<Uuid> {
        self.payload_uuid("followed_user_id")
    }

    /// Watch duration in seconds for `content.play`.
    pub fn watch_secs(&self) -> Option<u64> {
        self.payload.get("watch_duration_secs").and_then(|v| v.as_u64())
    }

    /// Free text attached to the event (comment body, rejection reason, ...).
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(|v| v.as_str())
    }
}

/// Convenience builder for the common `{content_id: ...}` payload.
pub fn content_payload(content_id: Uuid) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert(
        "content_id".to_string(),
        serde_json::Value::String(content_id.to_string()),
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_with_field_names() {
        let content = Uuid::new_v4();
        let envelope = EventEnvelope::new(
            EventKind::ContentLike,
            Uuid::new_v4(),
            content_payload(content),
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event_type"], "content.like");
        assert!(json["event_id"].is_string());
        assert_eq!(json["retry_count"], 0);

        let back: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_id, envelope.event_id);
        assert_eq!(back.event_type, EventKind::ContentLike);
        assert_eq!(back.content_id(), Some(content));
    }

    #[test]
    fn missing_optional_fields_default() {
        // A minimal producer may omit payload and retry_count entirely.
        let json = serde_json::json!({
            "event_id": Uuid::new_v4(),
            "event_type": "content.play",
            "timestamp": Utc::now(),
            "actor_user_id": Uuid::new_v4(),
        });

        let envelope: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(envelope.retry_count, 0);
        assert_eq!(envelope.schema_version, SCHEMA_VERSION);
        assert!(envelope.content_id().is_none());
    }

    #[test]
    fn malformed_payload_values_read_as_absent() {
        let mut payload = serde_json::Map::new();
        payload.insert("content_id".into(), serde_json::json!("not-a-uuid"));
        payload.insert("watch_duration_secs".into(), serde_json::json!("45"));

        let envelope = EventEnvelope::new(EventKind::ContentPlay, Uuid::new_v4(), payload);
        assert!(envelope.content_id().is_none());
        assert!(envelope.watch_secs().is_none());
    }

    #[test]
    fn kind_wire_names_match_serde() {
        for kind in EventKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }
}
