//! Rate limiting subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline: identity + matched route
//!     → limiter.rs check_and_consume (fixed window per identity+route)
//!     → allowed: request proceeds with remaining/reset metadata
//!     → blocked: 429 with Retry-After, request never reaches the upstream
//! ```
//!
//! # Design Decisions
//! - Fixed window counting: simple, O(1) per request, predictable memory
//! - Requests over the limit still increment the window counter, so the
//!   status surface reports true demand rather than capped demand
//! - Identity records are bounded; least recently seen records are evicted
//!   when the bound is exceeded

pub mod limiter;

pub use limiter::{RateLimitDecision, RateLimiter, RateSnapshot};
