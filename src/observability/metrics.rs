//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method, status
//! - `api_request_duration_seconds` (histogram): latency distribution
//! - `api_rate_limited_total` (counter): requests rejected by the limiter
//! - `api_auth_cache_total` (counter): auth cache lookups by outcome
//! - `api_bus_events_total` (counter): bus events by name and outcome
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations under the hood)
//! - Prometheus exporter is optional and bound to its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on the given address.
pub fn init_exporter(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(error) => tracing::error!(error = %error, "Failed to start metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("api_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Record a rate-limited rejection.
pub fn record_rate_limited() {
    counter!("api_rate_limited_total").increment(1);
}

/// Record an auth cache lookup outcome.
pub fn record_auth_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("api_auth_cache_total", "outcome" => outcome).increment(1);
}

/// Record a bus event publish or handler outcome.
pub fn record_bus_event(name: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    counter!("api_bus_events_total", "event" => name, "outcome" => outcome).increment(1);
}
