//! Consumer harness shared by every consumer group.
//!
//! Delivery lifecycle: deserialize → claim → handle → ack/nack. Workers never
//! reorder these steps; the idempotency claim is always the first action
//! after a message is received. Failures retry in-process with exponential
//! backoff, then the message is rejected without requeue so the broker
//! dead-letters it onto the queue's DLQ. Dead letters are watched, logged,
//! and left for an operator — there is no automatic reprocessing.

use async_trait::async_trait;
use event_schema::{EventEnvelope, QueueName};
use futures_util::StreamExt;
use idempotent_consumer::IdempotencyGuard;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{ConsumeError, EventBusError};

/// Business logic for one consumer group.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Queue this group consumes.
    fn queue(&self) -> QueueName;

    /// Consumer-group name used for idempotency claims and consumer tags.
    fn consumer_group(&self) -> &'static str;

    /// Apply the business effect for one claimed envelope.
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), ConsumeError>;
}

/// Retry policy for failed business effects.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 100,
            max_backoff_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given retry attempt (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let backoff = self.backoff_ms.saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(backoff.min(self.max_backoff_ms))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Options for a consumer group's worker pool.
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Parallel workers pulling from the queue.
    pub workers: usize,
    pub retry: RetryPolicy,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            workers: 3,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded worker pool for one consumer group.
pub struct ConsumerPool;

impl ConsumerPool {
    /// Spawn `options.workers` workers for the handler's queue. Each worker
    /// gets its own channel with prefetch 1, so in-flight work per group is
    /// bounded by the worker count.
    pub async fn spawn<H: EventHandler>(
        connection: &Connection,
        handler: Arc<H>,
        guard: IdempotencyGuard,
        options: ConsumerOptions,
    ) -> Result<Vec<JoinHandle<()>>, EventBusError> {
        let queue = handler.queue();
        let group = handler.consumer_group();

        let mut handles = Vec::with_capacity(options.workers);
        for worker in 0..options.workers {
            let channel = connection.create_channel().await?;
            channel.basic_qos(1, BasicQosOptions::default()).await?;

            let consumer = channel
                .basic_consume(
                    queue.queue(),
                    &format!("{group}-{worker}"),
                    BasicConsumeOptions::default(),
                    FieldTable::default(),
                )
                .await?;

            let handler = handler.clone();
            let guard = guard.clone();
            let retry = options.retry.clone();
            handles.push(tokio::spawn(async move {
                // Keep the channel handle alive for the worker's lifetime.
                let _channel = channel;
                let mut consumer = consumer;
                while let Some(delivery) = consumer.next().await {
                    match delivery {
                        Ok(delivery) => {
                            process_delivery(&*handler, &guard, &retry, delivery).await;
                        }
                        Err(e) => {
                            warn!(group, worker, "consumer stream error: {e}");
                        }
                    }
                }
                info!(group, worker, "consumer stream closed");
            }));
        }

        info!(
            group,
            queue = queue.queue(),
            workers = options.workers,
            "consumer pool started"
        );
        Ok(handles)
    }
}

async fn process_delivery<H: EventHandler>(
    handler: &H,
    guard: &IdempotencyGuard,
    retry: &RetryPolicy,
    delivery: Delivery,
) {
    let group = handler.consumer_group();

    let envelope: EventEnvelope = match serde_json::from_slice(&delivery.data) {
        Ok(envelope) => envelope,
        Err(e) => {
            // Undecodable bodies can never succeed; retrying would loop.
            warn!(group, "dropping malformed message body: {e}");
            ack(&delivery, group).await;
            return;
        }
    };

    if !guard.try_claim(envelope.event_id, group).await {
        debug!(
            group,
            event_id = %envelope.event_id,
            "duplicate delivery skipped"
        );
        ack(&delivery, group).await;
        return;
    }

    let mut attempt = 0;
    loop {
        match handler.handle(&envelope).await {
            Ok(()) => {
                debug!(
                    group,
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    "event processed"
                );
                ack(&delivery, group).await;
                return;
            }
            Err(ConsumeError::Malformed(msg)) => {
                warn!(
                    group,
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    "skipping malformed event: {msg}"
                );
                ack(&delivery, group).await;
                return;
            }
            Err(ConsumeError::Failed(e)) if retry.should_retry(attempt) => {
                let backoff = retry.backoff(attempt);
                warn!(
                    group,
                    event_id = %envelope.event_id,
                    attempt,
                    "processing failed, retrying in {backoff:?}: {e:#}"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(ConsumeError::Failed(e)) => {
                error!(
                    group,
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    attempts = attempt + 1,
                    "retries exhausted, dead-lettering: {e:#}"
                );
                // Release the claim so an operator requeue from the DLQ is
                // not skipped as a duplicate.
                guard.release(envelope.event_id, group).await;
                nack_to_dlq(&delivery, group).await;
                return;
            }
        }
    }
}

async fn ack(delivery: &Delivery, group: &str) {
    if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
        warn!(group, "failed to ack delivery: {e}");
    }
}

async fn nack_to_dlq(delivery: &Delivery, group: &str) {
    let options = BasicNackOptions {
        requeue: false,
        ..Default::default()
    };
    if let Err(e) = delivery.acker.nack(options).await {
        warn!(group, "failed to nack delivery: {e}");
    }
}

/// Watches a queue's DLQ so dead letters are observable.
///
/// Dead-lettered messages are terminal: the watcher logs them at error
/// severity and acknowledges, leaving the durable record to the broker and
/// the decision to an operator.
pub struct DeadLetterWatch;

impl DeadLetterWatch {
    pub async fn spawn(
        connection: &Connection,
        queue: QueueName,
    ) -> Result<JoinHandle<()>, EventBusError> {
        let channel: Channel = connection.create_channel().await?;
        let mut consumer = channel
            .basic_consume(
                queue.dead_letter_queue(),
                &format!("{}-dlq-watch", queue.routing_key()),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(tokio::spawn(async move {
            let _channel = channel;
            while let Some(delivery) = consumer.next().await {
                let delivery = match delivery {
                    Ok(delivery) => delivery,
                    Err(e) => {
                        warn!(dlq = queue.dead_letter_queue(), "DLQ stream error: {e}");
                        continue;
                    }
                };

                match serde_json::from_slice::<EventEnvelope>(&delivery.data) {
                    Ok(envelope) => error!(
                        dlq = queue.dead_letter_queue(),
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        actor_user_id = %envelope.actor_user_id,
                        "dead-lettered event requires operator attention"
                    ),
                    Err(_) => error!(
                        dlq = queue.dead_letter_queue(),
                        bytes = delivery.data.len(),
                        "dead-lettered undecodable message requires operator attention"
                    ),
                }

                if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                    warn!(dlq = queue.dead_letter_queue(), "failed to ack dead letter: {e}");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = RetryPolicy::default();

        assert!(policy.backoff(1) > policy.backoff(0));
        assert!(policy.backoff(2) > policy.backoff(1));
        assert_eq!(
            policy.backoff(30),
            Duration::from_millis(policy.max_backoff_ms)
        );
    }

    #[test]
    fn retry_limit_is_respected() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
