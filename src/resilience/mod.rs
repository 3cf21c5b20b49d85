//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call:
//!     → circuit_breaker.rs check (fail fast when the circuit is open)
//!     → guarded call runs with the route's timeout
//!     → outcome recorded (infrastructure failures only)
//! ```
//!
//! # Design Decisions
//! - One circuit per service name, created lazily, process lifetime
//! - Only infrastructure failures count toward the threshold; client
//!   mistakes never trip the breaker
//! - Fail fast in Open state: no timeout wait, no upstream resource consumed
//! - Single attempt per request; retry policy belongs to a layer above

pub mod circuit_breaker;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CircuitBreaker};
