//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → service identified
//!     → pool.rs (healthy instances for the service)
//!     → weighted.rs (weighted random draw over healthy instances)
//!     → Return selected ServiceInstance or none
//! ```
//!
//! # Design Decisions
//! - Selection reads instance state only; health is mutated by an external
//!   health-check process through the instance's mark methods
//! - Weighted random needs no per-call cumulative pre-computation
//! - No healthy instance means "upstream unavailable", never a retry loop

pub mod instance;
pub mod pool;
pub mod weighted;

use std::sync::Arc;

pub use instance::ServiceInstance;
pub use pool::InstancePool;
pub use weighted::WeightedRandom;

/// Strategy for picking an upstream instance.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Select an instance from the slice, or `None` if none is eligible.
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>>;
}
