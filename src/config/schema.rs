//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Route definitions mapping path prefixes to upstream services.
    pub routes: Vec<ServiceRouteConfig>,

    /// Fallback rate-limit quota and identity bound.
    pub rate_limit: RateLimitDefaults,

    /// Cache memory budget.
    pub cache: CacheBudgetConfig,

    /// Static API-key authentication.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Interval for the background sweep of expired records, in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: Vec::new(),
            rate_limit: RateLimitDefaults::default(),
            cache: CacheBudgetConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            sweep_interval_ms: 30_000,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Server-wide request timeout cap in milliseconds.
    /// Per-route timeouts apply inside this envelope.
    pub request_timeout_ms: u64,

    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_ms: 60_000,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Configuration for one logical upstream service.
///
/// Immutable for the lifetime of a route table snapshot; reloaded as a whole
/// unit, never partially mutated mid-request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceRouteConfig {
    /// Service name, used as the key for breaker and rate-limit state.
    pub name: String,

    /// Version tag.
    #[serde(default = "default_version")]
    pub version: String,

    /// Path prefix this route matches.
    pub path_prefix: String,

    /// Upstream instances with selection weights.
    pub instances: Vec<InstanceConfig>,

    /// Per-service upstream call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Circuit breaker thresholds.
    #[serde(default)]
    pub breaker: BreakerThresholds,

    /// Rate-limit quota for this route. Falls back to the gateway default
    /// quota when absent.
    #[serde(default)]
    pub rate_limit: Option<RateQuotaConfig>,

    /// Response cache policy.
    #[serde(default)]
    pub cache: CacheRouteConfig,

    /// Scopes the authenticated principal must carry.
    #[serde(default)]
    pub required_scopes: Vec<String>,
}

impl Default for ServiceRouteConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: default_version(),
            path_prefix: String::new(),
            instances: Vec::new(),
            timeout_ms: default_timeout_ms(),
            breaker: BreakerThresholds::default(),
            rate_limit: None,
            cache: CacheRouteConfig::default(),
            required_scopes: Vec::new(),
        }
    }
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// One deployable replica of an upstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Instance base address (e.g., "http://127.0.0.1:3000").
    pub address: String,

    /// Weight for weighted random selection (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Circuit breaker thresholds for one service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerThresholds {
    /// Failures within the monitoring window before opening the circuit.
    pub failure_threshold: u32,

    /// Successful half-open probes required to close the circuit again.
    pub success_threshold: u32,

    /// How long the circuit stays open before allowing a probe, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Rolling monitoring window for failure counting, in milliseconds.
    pub window_ms: u64,
}

impl Default for BreakerThresholds {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout_ms: 30_000,
            window_ms: 60_000,
        }
    }
}

/// Fixed-window rate-limit quota.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateQuotaConfig {
    /// Requests allowed per window.
    pub requests_per_window: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateQuotaConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_ms: 60_000,
        }
    }
}

/// Gateway-wide rate limiter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitDefaults {
    /// Quota applied when a route defines none (including unmatched paths).
    pub default_quota: RateQuotaConfig,

    /// Bound on tracked identities; least-recently-active records are purged
    /// first when exceeded.
    pub max_identities: usize,
}

impl Default for RateLimitDefaults {
    fn default() -> Self {
        Self {
            default_quota: RateQuotaConfig::default(),
            max_identities: 10_000,
        }
    }
}

/// Per-route response cache policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheRouteConfig {
    /// Enable response caching for this route.
    pub enabled: bool,

    /// Entry time-to-live in milliseconds.
    pub ttl_ms: u64,

    /// Header names whose values participate in the cache key.
    /// An explicit allow-list, never the full header set.
    pub vary_by_headers: Vec<String>,
}

impl Default for CacheRouteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_ms: 30_000,
            vary_by_headers: Vec::new(),
        }
    }
}

/// Cache memory budget, enforced synchronously on write.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheBudgetConfig {
    /// Maximum number of cached entries.
    pub max_entries: usize,

    /// Maximum total stored size in bytes.
    pub max_bytes: usize,
}

impl Default for CacheBudgetConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Static API-key authentication table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Enable authentication. When disabled every request resolves to the
    /// anonymous principal with no scopes.
    pub enabled: bool,

    /// Map of gateway key -> principal identity and granted scopes.
    pub api_keys: HashMap<String, ApiKeyEntry>,
}

/// One credential in the static key table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiKeyEntry {
    /// Principal identity resolved from this key.
    pub principal: String,

    /// Scopes granted to the principal.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
