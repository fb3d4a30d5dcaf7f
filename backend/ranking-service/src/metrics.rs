//! Prometheus metrics for the ranking pipeline.

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static EVENTS_PROCESSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ranking_events_processed_total",
        "Interaction events processed by the ranking consumer",
        &["event_type"]
    )
    .expect("Failed to register ranking events metric")
});

static RECOMPUTE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "ranking_score_recompute_duration_seconds",
        "Duration of a single score recompute (counter read + store write)",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("Failed to register recompute duration metric")
});

/// Count one processed interaction event.
pub fn inc_event_processed(event_type: &str) {
    EVENTS_PROCESSED_TOTAL
        .with_label_values(&[event_type])
        .inc();
}

/// Record one score recompute duration.
pub fn observe_recompute(duration: Duration) {
    RECOMPUTE_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// `/metrics` endpoint body.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&families, &mut buffer) {
        return HttpResponse::InternalServerError().body(format!("metrics encoding failed: {e}"));
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
