//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_rate_limited_total` (counter): blocked requests by route
//! - `gateway_breaker_transitions_total` (counter): circuit transitions
//! - `gateway_cache_hits_total` / `gateway_cache_misses_total` (counters)
//! - `gateway_cache_evictions_total` (counter)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Failure to bind is logged and
/// recording degrades to no-ops; the gateway itself keeps serving.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics endpoint started");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint");
        }
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("service", service.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route: &str) {
    metrics::counter!("gateway_rate_limited_total", "route" => route.to_string()).increment(1);
}

pub fn record_breaker_transition(service: &str, from: &str, to: &str) {
    metrics::counter!(
        "gateway_breaker_transitions_total",
        "service" => service.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_cache_hit() {
    metrics::counter!("gateway_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("gateway_cache_misses_total").increment(1);
}

pub fn record_cache_eviction() {
    metrics::counter!("gateway_cache_evictions_total").increment(1);
}
