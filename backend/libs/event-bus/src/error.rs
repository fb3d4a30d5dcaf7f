//! Error types for the event bus.

use thiserror::Error;

/// Errors raised while talking to the broker.
#[derive(Error, Debug)]
pub enum EventBusError {
    /// Connection, channel, or declaration failure.
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// A single destination send failed. Fan-out treats this as best-effort:
    /// it is logged by the publisher and never propagated to the caller.
    #[error("failed to send to queue {queue}: {source}")]
    TransientSend {
        queue: &'static str,
        #[source]
        source: lapin::Error,
    },
}

/// Outcome classification for a consumer's business effect.
#[derive(Error, Debug)]
pub enum ConsumeError {
    /// The payload can never be processed successfully. The harness logs a
    /// warning and acknowledges the message — retrying would loop forever.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The effect failed for a reason that may be transient. The harness
    /// retries in-process and dead-letters the message once retries are
    /// exhausted.
    #[error("processing failed: {0}")]
    Failed(#[source] anyhow::Error),
}

impl ConsumeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ConsumeError::Malformed(msg.into())
    }

    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        ConsumeError::Failed(err.into())
    }

    /// Whether the harness should retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsumeError::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_is_never_retried() {
        assert!(!ConsumeError::malformed("bad uuid").is_retryable());
        assert!(ConsumeError::failed(anyhow::anyhow!("db down")).is_retryable());
    }
}
