use actix_web::{middleware, web, App, HttpServer};
use db_pool::{create_pool as create_pg_pool, DbConfig as DbPoolConfig};
use event_bus::{ConsumerOptions, ConsumerPool, DeadLetterWatch, RetryPolicy};
use event_schema::QueueName;
use idempotent_consumer::IdempotencyGuard;
use ranking_service::db::PgCounterSource;
use ranking_service::services::{
    InterestStore, RankingEventHandler, RecommendService, RedisRankingStore, ScoreEngine,
};
use ranking_service::{handlers, metrics, Config};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ranking service");

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    // Database (read-only collaborator views)
    let mut db_cfg = DbPoolConfig::from_env("ranking-service").unwrap_or_default();
    if db_cfg.database_url.is_empty() {
        db_cfg.database_url = config.database.url.clone();
    }
    db_cfg.max_connections = db_cfg.max_connections.max(config.database.max_connections);
    let db_pool = create_pg_pool(db_cfg)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("database: {e}")))?;

    // Redis (ranking store, interest weights, idempotency claims)
    let redis = redis_utils::RedisPool::connect(&config.redis.url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("redis: {e}")))?;

    // Broker
    let connection = event_bus::connect(&config.broker.url, "ranking-service")
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("broker: {e}")))?;
    let channel = connection
        .create_channel()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("broker channel: {e}")))?;
    event_bus::declare_topology(&channel)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("topology: {e}")))?;

    // Wire the pipeline
    let counters = Arc::new(PgCounterSource::new(db_pool.clone()));
    let store = Arc::new(RedisRankingStore::new(redis.manager()));
    let engine = Arc::new(ScoreEngine::new(
        counters.clone(),
        store.clone(),
        config.ranking.clone(),
    ));
    let interest = Arc::new(InterestStore::new(redis.manager()));
    let handler = Arc::new(RankingEventHandler::new(
        engine,
        interest,
        config.ranking.clone(),
    ));

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
    let _dlq_watch = DeadLetterWatch::spawn(&connection, QueueName::RankingUpdate)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("dlq watch: {e}")))?;

    let recommend = Arc::new(RecommendService::new(
        store,
        counters,
        config.ranking.max_page_size,
    ));

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(recommend.clone()))
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::register_routes)
    })
    .bind(&addr)?
    .run()
    .await
}
