//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream assumed down, calls fail fast
//! - Half-Open: probing whether the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures within the monitoring window reach failure_threshold
//! Open → Half-Open: reset timeout elapsed; the next call becomes a probe
//! Half-Open → Closed: success_threshold accumulated probe successes
//! Half-Open → Open: a single probe failure (no partial credit)
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

/// Circuit breaker thresholds for one service.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures within `window` before the circuit opens.
    pub failure_threshold: u32,

    /// Accumulated half-open successes required to close again.
    pub success_threshold: u32,

    /// How long the circuit stays open before allowing a probe.
    pub reset_timeout: Duration,

    /// Rolling monitoring window for failure counting.
    pub window: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            window: Duration::from_secs(60),
        }
    }
}

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "CLOSED"),
            BreakerState::Open => write!(f, "OPEN"),
            BreakerState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Point-in-time view of one circuit, for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub service: String,
    pub state: BreakerState,
    /// Infrastructure failures currently inside the monitoring window.
    pub recent_failures: u32,
    pub half_open_successes: u32,
    pub total_successes: u64,
    pub total_failures: u64,
}

/// Per-service circuit state. All transitions happen under the mutex, so a
/// circuit is never observed with a partial update.
struct Circuit {
    state: BreakerState,
    /// Timestamps of infrastructure failures, pruned to the window.
    failures: VecDeque<Instant>,
    half_open_successes: u32,
    opened_at: Instant,
    /// Window last used against this circuit; kept for pruning in snapshots.
    window: Duration,
    total_successes: u64,
    total_failures: u64,
}

impl Circuit {
    fn new(window: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            failures: VecDeque::new(),
            half_open_successes: 0,
            opened_at: Instant::now(),
            window,
            total_successes: 0,
            total_failures: 0,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.duration_since(*oldest) >= self.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn transition(&mut self, service: &str, to: BreakerState) {
        let from = self.state;
        self.state = to;
        tracing::warn!(
            service = %service,
            from = %from,
            to = %to,
            "Circuit state transition"
        );
        metrics::record_breaker_transition(service, &from.to_string(), &to.to_string());
    }
}

/// Per-service failure isolator.
///
/// Circuits are created lazily on first use and live for the process
/// lifetime. Keyed records carry their own lock so unrelated services never
/// serialize on each other.
pub struct CircuitBreaker {
    circuits: DashMap<String, Arc<Mutex<Circuit>>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            circuits: DashMap::new(),
        }
    }

    fn circuit(&self, service: &str, config: &BreakerConfig) -> Arc<Mutex<Circuit>> {
        self.circuits
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Circuit::new(config.window))))
            .clone()
    }

    /// Gate a call. Returns the state the call executes under, or fails fast
    /// with `CircuitOpen` without consuming any upstream resource.
    ///
    /// When the reset timeout has elapsed the circuit moves to Half-Open
    /// before the call executes, making that call the probe.
    pub fn check(&self, service: &str, config: &BreakerConfig) -> GatewayResult<BreakerState> {
        let circuit = self.circuit(service, config);
        let mut circuit = circuit.lock().expect("circuit mutex poisoned");
        circuit.window = config.window;

        match circuit.state {
            BreakerState::Closed => Ok(BreakerState::Closed),
            BreakerState::Open => {
                if circuit.opened_at.elapsed() >= config.reset_timeout {
                    circuit.half_open_successes = 0;
                    circuit.transition(service, BreakerState::HalfOpen);
                    Ok(BreakerState::HalfOpen)
                } else {
                    Err(GatewayError::CircuitOpen {
                        service: service.to_string(),
                        failures: circuit.failures.len() as u32,
                    })
                }
            }
            BreakerState::HalfOpen => Ok(BreakerState::HalfOpen),
        }
    }

    /// Record a successful guarded call.
    pub fn record_success(&self, service: &str, config: &BreakerConfig) {
        let circuit = self.circuit(service, config);
        let mut circuit = circuit.lock().expect("circuit mutex poisoned");
        circuit.total_successes += 1;

        if circuit.state == BreakerState::HalfOpen {
            circuit.half_open_successes += 1;
            if circuit.half_open_successes >= config.success_threshold {
                circuit.failures.clear();
                circuit.half_open_successes = 0;
                circuit.transition(service, BreakerState::Closed);
            }
        }
    }

    /// Record an infrastructure failure of a guarded call.
    pub fn record_failure(&self, service: &str, config: &BreakerConfig) {
        let circuit = self.circuit(service, config);
        let mut circuit = circuit.lock().expect("circuit mutex poisoned");
        let now = Instant::now();
        circuit.total_failures += 1;
        circuit.prune(now);
        circuit.failures.push_back(now);

        match circuit.state {
            // A probe failure reopens immediately, restarting the timer.
            BreakerState::HalfOpen => {
                circuit.opened_at = now;
                circuit.transition(service, BreakerState::Open);
            }
            BreakerState::Closed => {
                if circuit.failures.len() as u32 >= config.failure_threshold {
                    circuit.opened_at = now;
                    circuit.transition(service, BreakerState::Open);
                }
            }
            BreakerState::Open => {}
        }
    }

    /// Run an operation guarded by this service's circuit.
    ///
    /// Only errors classified as infrastructure failures count toward the
    /// threshold. A future dropped before resolution records nothing: the
    /// upstream outcome is unknown, so cancellation is neither success nor
    /// failure.
    pub async fn execute<F, Fut, T>(
        &self,
        service: &str,
        config: &BreakerConfig,
        op: F,
    ) -> GatewayResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        self.check(service, config)?;

        match op().await {
            Ok(value) => {
                self.record_success(service, config);
                Ok(value)
            }
            Err(e) => {
                if e.is_infrastructure() {
                    self.record_failure(service, config);
                }
                Err(e)
            }
        }
    }

    /// Snapshot of one circuit, if it exists yet.
    pub fn snapshot(&self, service: &str) -> Option<BreakerSnapshot> {
        self.circuits.get(service).map(|entry| {
            let mut circuit = entry.value().lock().expect("circuit mutex poisoned");
            circuit.prune(Instant::now());
            BreakerSnapshot {
                service: service.to_string(),
                state: circuit.state,
                recent_failures: circuit.failures.len() as u32,
                half_open_successes: circuit.half_open_successes,
                total_successes: circuit.total_successes,
                total_failures: circuit.total_failures,
            }
        })
    }

    /// Snapshots of every circuit created so far.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut all: Vec<BreakerSnapshot> = self
            .circuits
            .iter()
            .map(|entry| {
                let mut circuit = entry.value().lock().expect("circuit mutex poisoned");
                circuit.prune(Instant::now());
                BreakerSnapshot {
                    service: entry.key().clone(),
                    state: circuit.state,
                    recent_failures: circuit.failures.len() as u32,
                    half_open_successes: circuit.half_open_successes,
                    total_successes: circuit.total_successes,
                    total_failures: circuit.total_failures,
                }
            })
            .collect();
        all.sort_by(|a, b| a.service.cmp(&b.service));
        all
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
