//! Upstream instance state.
//!
//! # Responsibilities
//! - Represent a single deployable replica of an upstream service
//! - Track health state, last health check, and observed latency
//! - Stay cheap to read concurrently from many pipeline executions

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use url::Url;

/// Health state of an instance.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// One deployable replica of an upstream service.
///
/// The service registry owns the set of instances; the load balancer only
/// reads them. Health is flipped by an external health-check process via
/// [`mark_healthy`](Self::mark_healthy) / [`mark_unhealthy`](Self::mark_unhealthy).
#[derive(Debug)]
pub struct ServiceInstance {
    /// Base address of the instance.
    pub address: Url,

    /// Relative weight used in weighted selection.
    pub weight: u32,

    /// Current health state (0=Unknown, 1=Healthy, 2=Unhealthy).
    state: AtomicU8,

    /// Unix-millis timestamp of the last health mark, 0 if never marked.
    last_check_ms: AtomicU64,

    /// Most recent observed upstream latency in microseconds, 0 if none.
    latency_us: AtomicU64,
}

impl ServiceInstance {
    pub fn new(address: Url, weight: u32) -> Self {
        Self {
            address,
            weight,
            state: AtomicU8::new(HealthState::Unknown as u8),
            last_check_ms: AtomicU64::new(0),
            latency_us: AtomicU64::new(0),
        }
    }

    /// Return true if the instance may receive traffic (Healthy or Unknown).
    pub fn is_healthy(&self) -> bool {
        self.state.load(Ordering::Relaxed) != HealthState::Unhealthy as u8
    }

    pub fn health(&self) -> HealthState {
        self.state.load(Ordering::Relaxed).into()
    }

    pub fn mark_healthy(&self) {
        self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
        self.last_check_ms.store(unix_millis(), Ordering::Relaxed);
    }

    pub fn mark_unhealthy(&self) {
        self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
        self.last_check_ms.store(unix_millis(), Ordering::Relaxed);
    }

    /// Unix-millis timestamp of the last health mark, if any.
    pub fn last_check_ms(&self) -> Option<u64> {
        match self.last_check_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Record an observed upstream call latency.
    pub fn record_latency(&self, latency: Duration) {
        self.latency_us
            .store(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Most recently observed latency, if any call has completed.
    pub fn observed_latency(&self) -> Option<Duration> {
        match self.latency_us.load(Ordering::Relaxed) {
            0 => None,
            us => Some(Duration::from_micros(us)),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_instances_count_as_healthy() {
        let instance =
            ServiceInstance::new("http://127.0.0.1:3000".parse().unwrap(), 1);
        assert_eq!(instance.health(), HealthState::Unknown);
        assert!(instance.is_healthy());
        assert!(instance.last_check_ms().is_none());
    }

    #[test]
    fn health_marks_update_state_and_timestamp() {
        let instance =
            ServiceInstance::new("http://127.0.0.1:3000".parse().unwrap(), 1);

        instance.mark_unhealthy();
        assert!(!instance.is_healthy());
        assert!(instance.last_check_ms().is_some());

        instance.mark_healthy();
        assert!(instance.is_healthy());
        assert_eq!(instance.health(), HealthState::Healthy);
    }

    #[test]
    fn latency_observation_roundtrips() {
        let instance =
            ServiceInstance::new("http://127.0.0.1:3000".parse().unwrap(), 1);
        assert!(instance.observed_latency().is_none());

        instance.record_latency(Duration::from_millis(42));
        assert_eq!(instance.observed_latency(), Some(Duration::from_millis(42)));
    }
}
