//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! http server → request.rs (buffered GatewayRequest)
//!     → handler.rs stages:
//!         authenticate → authorize → rate limit → cache lookup
//!         → route check → instance selection → guarded upstream call
//!         → cache store → response decoration
//!     → upstream.rs performs the actual HTTP call
//! ```
//!
//! # Design Decisions
//! - The first failing stage short-circuits; later stages never run, so a
//!   rate-limited request consumes no upstream capacity and a cache hit
//!   never touches an upstream instance
//! - Unrouted requests are still rate limited (default quota) before the
//!   404 is returned, so unknown paths cannot be used to probe for free
//! - The upstream call is a trait object so tests drive the pipeline with
//!   scripted upstreams instead of sockets

pub mod handler;
pub mod request;
pub mod upstream;

pub use handler::Pipeline;
pub use request::{GatewayRequest, GatewayResponse};
pub use upstream::{HttpUpstream, UpstreamClient};
