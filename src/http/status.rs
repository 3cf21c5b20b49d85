//! Operational status endpoints.
//!
//! Read-only JSON views over the live components. Served on the gateway
//! listener under `/gateway/`, which is reserved and never proxied.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::http::server::AppState;
use crate::load_balancer::instance::HealthState;

/// `GET /gateway/status`: routes, instances, and circuit states.
pub async fn gateway_status(State(state): State<AppState>) -> Json<Value> {
    let table = state.routes.load_full();

    let routes: Vec<Value> = table
        .routes()
        .iter()
        .map(|route| {
            let instances: Vec<Value> = route
                .pool
                .instances()
                .iter()
                .map(|instance| {
                    json!({
                        "address": instance.address.as_str(),
                        "weight": instance.weight,
                        "health": health_label(instance.health()),
                        "last_check_ms": instance.last_check_ms(),
                        "observed_latency_us": instance
                            .observed_latency()
                            .map(|d| d.as_micros() as u64),
                    })
                })
                .collect();

            json!({
                "name": route.name,
                "version": route.version,
                "path_prefix": route.path_prefix,
                "timeout_ms": route.timeout.as_millis() as u64,
                "instances": instances,
                "breaker": state.breaker.snapshot(&route.name),
            })
        })
        .collect();

    Json(json!({
        "gateway": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "routes": routes,
    }))
}

/// `GET /gateway/ratelimit`: live counting windows.
pub async fn ratelimit_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "tracked_identities": state.limiter.tracked_identities(),
        "windows": state.limiter.snapshots(),
    }))
}

/// `GET /gateway/cache`: aggregate cache counters.
pub async fn cache_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.cache.stats()))
}

fn health_label(state: HealthState) -> &'static str {
    match state {
        HealthState::Unknown => "unknown",
        HealthState::Healthy => "healthy",
        HealthState::Unhealthy => "unhealthy",
    }
}
