//! Audit consumer group.
//!
//! Persists one audit row per delivered envelope, unconditionally and
//! independently of every other consumer group. No business validation
//! happens here beyond type coercion: a payload without a readable content
//! id still produces a row, just without one.

use async_trait::async_trait;
use event_bus::{ConsumeError, EventHandler};
use event_schema::{EventEnvelope, QueueName};
use std::sync::Arc;

use crate::services::audit_log::AuditLogService;

pub const CONSUMER_GROUP: &str = "audit-consumer";

pub struct AuditLogHandler {
    service: Arc<AuditLogService>,
}

impl AuditLogHandler {
    pub fn new(service: Arc<AuditLogService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for AuditLogHandler {
    fn queue(&self) -> QueueName {
        QueueName::Audit
    }

    fn consumer_group(&self) -> &'static str {
        CONSUMER_GROUP
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), ConsumeError> {
        // content_id is best-effort; malformed values coerce to None.
        self.service
            .record(
                envelope.actor_user_id,
                envelope.event_type.as_str(),
                envelope.content_id(),
            )
            .await
            .map_err(ConsumeError::failed)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_schema::{content_payload, EventKind};
    use uuid::Uuid;

    #[test]
    fn audit_queue_accepts_every_kind() {
        for kind in EventKind::ALL {
            assert!(QueueName::Audit.accepts(kind), "{kind} must be auditable");
        }
    }

    #[test]
    fn content_id_extraction_is_best_effort() {
        let with = EventEnvelope::new(
            EventKind::ContentPlay,
            Uuid::new_v4(),
            content_payload(Uuid::new_v4()),
        );
        assert!(with.content_id().is_some());

        let mut bad_payload = serde_json::Map::new();
        bad_payload.insert("content_id".into(), serde_json::json!(12345));
        let without = EventEnvelope::new(EventKind::UserRegistered, Uuid::new_v4(), bad_payload);
        assert!(without.content_id().is_none());
    }
}
