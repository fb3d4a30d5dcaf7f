//! Redis connection management shared by the pipeline services.
//!
//! All services talk to Redis through a [`ConnectionManager`] behind a Tokio
//! mutex: the manager reconnects transparently, the mutex serializes command
//! submission per clone. Commands that sit on the hot path wrap themselves in
//! [`with_timeout`] so a wedged connection cannot stall a consumer worker.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::Client;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Default per-command timeout.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis connection pool.
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    /// Connect and build the shared connection manager.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("failed to parse REDIS_URL")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        info!("Redis connection manager initialized");

        Ok(Self {
            manager: Arc::new(Mutex::new(manager)),
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}

/// Run a Redis operation with the default command timeout.
///
/// Returns an error both on command failure and on timeout so callers can
/// treat the two uniformly.
pub async fn with_timeout<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match timeout(COMMAND_TIMEOUT, fut).await {
        Ok(res) => res.context("redis command failed"),
        Err(_) => Err(anyhow::anyhow!(
            "redis command timed out after {:?}",
            COMMAND_TIMEOUT
        )),
    }
}
