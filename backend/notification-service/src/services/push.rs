//! Best-effort forwarding to the realtime push collaborator.
//!
//! The persisted notification row is the durable record; a push failure is
//! logged and never retried.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::models::PushMessage;

/// "Deliver to user X" primitive exposed by the realtime collaborator.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn push_to_user(&self, user_id: Uuid, message: &PushMessage) -> anyhow::Result<()>;
}

/// HTTP gateway client.
pub struct HttpPushGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPushGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn push_to_user(&self, user_id: Uuid, message: &PushMessage) -> anyhow::Result<()> {
        let url = format!("{}/internal/push/{user_id}", self.base_url);

        let response = self.client.post(&url).json(message).send().await?;
        response.error_for_status()?;

        debug!(%user_id, notification_id = %message.notification_id, "pushed to user");
        Ok(())
    }
}

/// Disabled push: persistence only. Used when no gateway is configured and
/// in tests.
pub struct NoopPushGateway;

#[async_trait]
impl PushGateway for NoopPushGateway {
    async fn push_to_user(&self, user_id: Uuid, message: &PushMessage) -> anyhow::Result<()> {
        debug!(%user_id, notification_id = %message.notification_id, "push disabled, skipping");
        Ok(())
    }
}
