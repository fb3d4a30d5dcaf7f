use analytics_service::services::{AuditLogHandler, AuditLogService};
use analytics_service::Config;
use db_pool::{create_pool as create_pg_pool, DbConfig as DbPoolConfig};
use event_bus::{ConsumerOptions, ConsumerPool, DeadLetterWatch, RetryPolicy};
use event_schema::QueueName;
use idempotent_consumer::IdempotencyGuard;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting analytics service");

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let mut db_cfg = DbPoolConfig::from_env("analytics-service").unwrap_or_default();
    if db_cfg.database_url.is_empty() {
        db_cfg.database_url = config.database.url.clone();
    }
    let db_pool = create_pg_pool(db_cfg)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("database: {e}")))?;

    let redis = redis_utils::RedisPool::connect(&config.redis.url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("redis: {e}")))?;

    let connection = event_bus::connect(&config.broker.url, "analytics-service")
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("broker: {e}")))?;
    let channel = connection
        .create_channel()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("broker channel: {e}")))?;
    event_bus::declare_topology(&channel)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("topology: {e}")))?;

    let handler = Arc::new(AuditLogHandler::new(Arc::new(AuditLogService::new(
        db_pool,
    ))));

    let guard = IdempotencyGuard::new(
        redis.manager(),
        Duration::from_secs(config.redis.idempotency_ttl_secs),
    );
    let options = ConsumerOptions {
        workers: config.broker.consumer_workers,
        retry: RetryPolicy {
            max_retries: config.broker.max_retries,
            ..Default::default()
        },
    };
    let _workers = ConsumerPool::spawn(&connection, handler, guard, options)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("consumer: {e}")))?;
    let _dlq_watch = DeadLetterWatch::spawn(&connection, QueueName::Audit)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("dlq watch: {e}")))?;

    tracing::info!("audit consumer running, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
