//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → structured log events (tracing, stdout)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → /gateway/* status endpoints (JSON snapshots, served by http)
//! ```
//!
//! # Design Decisions
//! - Metric updates are cheap atomic operations; recording never blocks
//!   the request path
//! - The request ID flows through every log event for correlation
//! - Status endpoints read live component snapshots rather than a
//!   separate bookkeeping layer, so they can never drift from reality

pub mod metrics;
