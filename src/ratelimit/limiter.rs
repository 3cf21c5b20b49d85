//! Fixed-window rate limiter keyed by identity and route.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::config::schema::{RateLimitDefaults, RateQuotaConfig};
use crate::observability::metrics;

/// One counting window per (identity, route) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RateKey {
    identity: String,
    route: String,
}

#[derive(Debug)]
struct RateRecord {
    window_start: Instant,
    window: Duration,
    limit: u32,
    /// Requests seen this window, including blocked ones.
    count: u32,
    total_requests: u64,
    total_blocked: u64,
    /// Monotonic access stamp used for least-recently-seen eviction.
    last_seen: u64,
}

/// Outcome of one rate limit check.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests still allowed in the current window.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
    pub limit: u32,
}

/// Point-in-time view of one counting window, for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct RateSnapshot {
    pub identity: String,
    pub route: String,
    pub limit: u32,
    pub window_count: u32,
    pub remaining: u32,
    /// Milliseconds until the current window resets, 0 when already over.
    pub resets_in_ms: u64,
    pub total_requests: u64,
    pub total_blocked: u64,
}

/// Fixed-window limiter over a bounded set of identity records.
///
/// Each (identity, route) pair owns an independent window. A window starts
/// on the first request after expiry and runs for the quota's duration;
/// counts never carry over between windows.
pub struct RateLimiter {
    records: DashMap<RateKey, RateRecord>,
    defaults: RateQuotaConfig,
    max_identities: usize,
    stamp: std::sync::atomic::AtomicU64,
}

impl RateLimiter {
    pub fn new(defaults: &RateLimitDefaults) -> Self {
        Self {
            records: DashMap::new(),
            defaults: defaults.default_quota.clone(),
            max_identities: defaults.max_identities.max(1),
            stamp: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Count one request against the identity's window and decide whether
    /// it may proceed. Over-limit requests still increment the counter.
    ///
    /// `quota` is the matched route's quota; unrouted requests fall back to
    /// the default quota so unknown paths cannot bypass limiting.
    pub fn check_and_consume(
        &self,
        identity: &str,
        route: &str,
        quota: Option<&RateQuotaConfig>,
    ) -> RateLimitDecision {
        let quota = quota.unwrap_or(&self.defaults);
        let window = Duration::from_millis(quota.window_ms.max(1));
        let now = Instant::now();
        let stamp = self
            .stamp
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let key = RateKey {
            identity: identity.to_string(),
            route: route.to_string(),
        };

        let mut record = self.records.entry(key).or_insert_with(|| RateRecord {
            window_start: now,
            window,
            limit: quota.requests_per_window,
            count: 0,
            total_requests: 0,
            total_blocked: 0,
            last_seen: stamp,
        });

        // Quota changes (config reload) take effect on the next window.
        if now.duration_since(record.window_start) >= record.window {
            record.window_start = now;
            record.window = window;
            record.limit = quota.requests_per_window;
            record.count = 0;
        }

        record.count += 1;
        record.total_requests += 1;
        record.last_seen = stamp;

        let allowed = record.count <= record.limit;
        if !allowed {
            record.total_blocked += 1;
        }
        let decision = RateLimitDecision {
            allowed,
            remaining: record.limit.saturating_sub(record.count),
            reset_after: record
                .window
                .saturating_sub(now.duration_since(record.window_start)),
            limit: record.limit,
        };
        drop(record);

        if !allowed {
            metrics::record_rate_limited(route);
        }
        if self.records.len() > self.max_identities {
            self.evict_oldest();
        }

        decision
    }

    /// Drop the least recently seen records until back under the bound.
    fn evict_oldest(&self) {
        while self.records.len() > self.max_identities {
            let oldest = self
                .records
                .iter()
                .min_by_key(|entry| entry.value().last_seen)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.records.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Drop records whose window expired at least one full window ago.
    /// Run periodically so idle identities do not pin memory.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, record| {
            now.duration_since(record.window_start) < record.window * 2
        });
        let removed = before - self.records.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired rate limit records");
        }
    }

    pub fn tracked_identities(&self) -> usize {
        self.records.len()
    }

    /// Snapshots of every live counting window.
    pub fn snapshots(&self) -> Vec<RateSnapshot> {
        let now = Instant::now();
        let mut all: Vec<RateSnapshot> = self
            .records
            .iter()
            .map(|entry| {
                let record = entry.value();
                RateSnapshot {
                    identity: entry.key().identity.clone(),
                    route: entry.key().route.clone(),
                    limit: record.limit,
                    window_count: record.count,
                    remaining: record.limit.saturating_sub(record.count),
                    resets_in_ms: record
                        .window
                        .saturating_sub(now.duration_since(record.window_start))
                        .as_millis() as u64,
                    total_requests: record.total_requests,
                    total_blocked: record.total_blocked,
                }
            })
            .collect();
        all.sort_by(|a, b| {
            a.identity
                .cmp(&b.identity)
                .then_with(|| a.route.cmp(&b.route))
        });
        all
    }
}
