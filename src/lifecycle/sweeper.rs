//! Periodic expiry sweeps for the limiter and the cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::cache::ResponseCache;
use crate::ratelimit::RateLimiter;

/// Background task that reclaims expired limiter records and stale cache
/// entries on a fixed interval.
pub struct Sweeper {
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(limiter: Arc<RateLimiter>, cache: Arc<ResponseCache>, interval: Duration) -> Self {
        Self {
            limiter,
            cache,
            interval,
        }
    }

    /// One sweep over both stores. Exposed so tests can drive expiry
    /// deterministically.
    pub fn sweep_once(&self) {
        self.limiter.sweep_expired();
        self.cache.sweep_expired();
    }

    /// Sweep on a fixed interval until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Sweeper stopping");
                    break;
                }
            }
        }
    }
}
