//! Best-effort fan-out publisher.

use event_schema::routing::{DELAY_EXCHANGE, EXCHANGE};
use event_schema::{EventEnvelope, EventKind};
use futures_util::future::join_all;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel};
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::EventBusError;

/// Publishes logical actions as envelopes fanned out to their destination
/// queues.
///
/// Publishing never blocks or fails the caller: each destination gets an
/// independent send, and any failure is logged and swallowed. The broker's
/// at-least-once guarantee starts once a send is accepted; everything before
/// that is best-effort by design.
#[derive(Clone)]
pub struct EventPublisher {
    channel: Channel,
}

impl EventPublisher {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Build an envelope for the action and fan it out. Returns the generated
    /// event id.
    pub async fn publish(
        &self,
        event_type: EventKind,
        actor_user_id: Uuid,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> Uuid {
        let envelope = EventEnvelope::new(event_type, actor_user_id, payload);
        self.fan_out(&envelope, EXCHANGE, None).await;
        envelope.event_id
    }

    /// Publish through the delay queue; the event becomes visible to normal
    /// consumers after `delay`.
    pub async fn publish_delayed(
        &self,
        event_type: EventKind,
        actor_user_id: Uuid,
        payload: serde_json::Map<String, serde_json::Value>,
        delay: Duration,
    ) -> Uuid {
        let envelope = EventEnvelope::new(event_type, actor_user_id, payload);
        self.fan_out(&envelope, DELAY_EXCHANGE, Some(delay)).await;
        envelope.event_id
    }

    async fn fan_out(&self, envelope: &EventEnvelope, exchange: &str, delay: Option<Duration>) {
        let body = match serde_json::to_vec(envelope) {
            Ok(body) => body,
            Err(e) => {
                // Envelope payloads are plain JSON maps; failing here means a
                // bug, not a transient condition. Log and drop.
                error!(event_id = %envelope.event_id, "failed to serialize envelope: {e}");
                return;
            }
        };

        let sends = envelope.destinations().iter().map(|destination| {
            let body = body.as_slice();
            async move {
                match self
                    .send(exchange, destination.routing_key(), body, delay)
                    .await
                {
                    Ok(()) => debug!(
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        queue = destination.queue(),
                        "event published"
                    ),
                    Err(e) => error!(
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        queue = destination.queue(),
                        "event publish failed: {e}"
                    ),
                }
            }
        });

        // Independent sends; one failing destination never aborts the rest.
        join_all(sends).await;
    }

    async fn send(
        &self,
        exchange: &str,
        routing_key: &'static str,
        body: &[u8],
        delay: Option<Duration>,
    ) -> Result<(), EventBusError> {
        let mut properties = BasicProperties::default()
            .with_delivery_mode(2) // persistent
            .with_content_type("application/json".into());

        if let Some(delay) = delay {
            properties = properties.with_expiration(delay.as_millis().to_string().into());
        }

        let confirm = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|source| EventBusError::TransientSend {
                queue: routing_key,
                source,
            })?;

        confirm
            .await
            .map_err(|source| EventBusError::TransientSend {
                queue: routing_key,
                source,
            })?;

        Ok(())
    }
}
