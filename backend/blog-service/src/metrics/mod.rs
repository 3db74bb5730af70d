//! Prometheus metrics for blog-service.
//!
//! Collectors are registered in the default registry on first use and
//! rendered by [`serve_metrics`] on `/metrics`.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Access decisions segmented by outcome (granted/locked) and post kind (free/paid).
    pub static ref ACCESS_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_access_decisions_total",
        "Access decisions segmented by outcome and post kind",
        &["outcome", "kind"]
    )
    .expect("failed to register blog_access_decisions_total");

    /// Ledger lookups performed while evaluating access.
    pub static ref LEDGER_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_ledger_lookups_total",
        "Purchase ledger lookups segmented by mode",
        &["mode"]
    )
    .expect("failed to register blog_ledger_lookups_total");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blog_http_request_duration_seconds",
        "HTTP request duration segmented by method and status",
        &["method", "status"]
    )
    .expect("failed to register blog_http_request_duration_seconds");
}

pub fn record_decision(outcome: &str, is_free: bool) {
    let kind = if is_free { "free" } else { "paid" };
    ACCESS_DECISIONS_TOTAL
        .with_label_values(&[outcome, kind])
        .inc();
}

pub fn record_ledger_lookup(mode: &str) {
    LEDGER_LOOKUPS_TOTAL.with_label_values(&[mode]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
