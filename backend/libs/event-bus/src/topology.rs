//! Broker topology declaration.
//!
//! Layout: one direct exchange (`ripple.events`) with a durable queue per
//! purpose, each carrying `x-dead-letter-*` arguments pointing at the
//! dead-letter exchange so rejected messages land on the paired DLQ. The
//! delay queue binds to its own exchange under every destination routing key
//! and dead-letters back into the main exchange without overriding the
//! routing key, so an expired message fans out exactly like a fresh one.

use event_schema::routing::{
    DELAY_EXCHANGE, DELAY_QUEUE, DLX_EXCHANGE, EXCHANGE,
};
use event_schema::QueueName;
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::info;

use crate::error::EventBusError;

/// Connect to the broker with a named connection.
pub async fn connect(amqp_url: &str, connection_name: &str) -> Result<Connection, EventBusError> {
    let connection = Connection::connect(
        amqp_url,
        ConnectionProperties::default().with_connection_name(connection_name.into()),
    )
    .await?;

    info!(connection_name, "connected to broker");
    Ok(connection)
}

/// Arguments attaching a queue to the dead-letter exchange.
pub fn dead_letter_args(queue: QueueName) -> FieldTable {
    let mut args = FieldTable::default();
    args.insert(
        "x-dead-letter-exchange".into(),
        AMQPValue::LongString(DLX_EXCHANGE.into()),
    );
    args.insert(
        "x-dead-letter-routing-key".into(),
        AMQPValue::LongString(queue.dead_letter_routing_key().into()),
    );
    args
}

/// Arguments routing expired delay-queue messages back to the main exchange.
///
/// No `x-dead-letter-routing-key` here: the message keeps the routing key it
/// was published with, which is what makes the post-delay fan-out identical
/// to the immediate path.
pub fn delay_queue_args() -> FieldTable {
    let mut args = FieldTable::default();
    args.insert(
        "x-dead-letter-exchange".into(),
        AMQPValue::LongString(EXCHANGE.into()),
    );
    args
}

async fn declare_direct_exchange(channel: &Channel, name: &str) -> Result<(), EventBusError> {
    channel
        .exchange_declare(
            name,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Declare the full topology. Idempotent; every service calls this on
/// startup so whichever comes up first creates the layout.
pub async fn declare_topology(channel: &Channel) -> Result<(), EventBusError> {
    declare_direct_exchange(channel, EXCHANGE).await?;
    declare_direct_exchange(channel, DLX_EXCHANGE).await?;
    declare_direct_exchange(channel, DELAY_EXCHANGE).await?;

    let durable = QueueDeclareOptions {
        durable: true,
        ..Default::default()
    };

    for queue in QueueName::ALL {
        channel
            .queue_declare(queue.queue(), durable, dead_letter_args(queue))
            .await?;
        channel
            .queue_declare(queue.dead_letter_queue(), durable, FieldTable::default())
            .await?;

        channel
            .queue_bind(
                queue.queue(),
                EXCHANGE,
                queue.routing_key(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_bind(
                queue.dead_letter_queue(),
                DLX_EXCHANGE,
                queue.dead_letter_routing_key(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
    }

    // Delay queue listens for every destination routing key so a deferred
    // event can target any of the normal queues after its TTL runs out.
    channel
        .queue_declare(DELAY_QUEUE, durable, delay_queue_args())
        .await?;
    for queue in QueueName::ALL {
        channel
            .queue_bind(
                DELAY_QUEUE,
                DELAY_EXCHANGE,
                queue.routing_key(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
    }

    info!("broker topology declared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::types::ShortString;

    #[test]
    fn queue_args_point_at_dlx() {
        let args = dead_letter_args(QueueName::RankingUpdate);
        let inner = args.inner();

        assert_eq!(
            inner.get(&ShortString::from("x-dead-letter-exchange")),
            Some(&AMQPValue::LongString(DLX_EXCHANGE.into()))
        );
        assert_eq!(
            inner.get(&ShortString::from("x-dead-letter-routing-key")),
            Some(&AMQPValue::LongString("ranking.dlq".into()))
        );
    }

    #[test]
    fn delay_args_keep_original_routing_key() {
        let args = delay_queue_args();
        let inner = args.inner();

        assert_eq!(
            inner.get(&ShortString::from("x-dead-letter-exchange")),
            Some(&AMQPValue::LongString(EXCHANGE.into()))
        );
        assert!(inner
            .get(&ShortString::from("x-dead-letter-routing-key"))
            .is_none());
    }
}
