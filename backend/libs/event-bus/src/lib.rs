//! AMQP event bus for the Ripple interaction pipeline.
//!
//! Three pieces, used together by every service:
//!
//! - [`topology`] declares the broker layout: one direct exchange, a durable
//!   queue per purpose with a paired dead-letter queue, and a delay queue for
//!   deferred events.
//! - [`EventPublisher`] fans a logical action out to its destination queues
//!   with per-destination error isolation — a failed send is logged and never
//!   surfaced to the caller.
//! - [`ConsumerPool`] runs a bounded worker pool per consumer group. Each
//!   delivery is claimed through the idempotency guard before any business
//!   effect, retried in-process on failure, and dead-lettered once retries
//!   are exhausted.

pub mod consumer;
pub mod error;
pub mod publisher;
pub mod topology;

pub use consumer::{ConsumerOptions, ConsumerPool, DeadLetterWatch, EventHandler, RetryPolicy};
pub use error::{ConsumeError, EventBusError};
pub use publisher::EventPublisher;
pub use topology::{connect, declare_topology};
