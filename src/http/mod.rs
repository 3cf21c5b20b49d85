//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP accept → axum router
//!     /gateway/*  → status.rs (operational JSON snapshots)
//!     everything  → server.rs proxy handler
//!         → body buffered up to the configured cap
//!         → pipeline::handle
//!         → response or error rendered to the client
//! ```
//!
//! # Design Decisions
//! - One catch-all route; path resolution belongs to the routing table,
//!   not the axum router
//! - Config reloads swap the route table atomically; listener and auth
//!   changes require a restart and are logged as skipped

pub mod server;
pub mod status;

pub use server::GatewayServer;
