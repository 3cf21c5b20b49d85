//! Edge Gateway
//!
//! A resilience-focused API gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                 EDGE GATEWAY                   │
//!                      │                                                │
//!   Client Request     │  ┌────────┐   ┌──────────────────────────┐    │
//!   ──────────────────▶│  │  http  │──▶│        pipeline          │    │
//!                      │  │ server │   │ auth → limit → cache →   │    │
//!                      │  └────────┘   │ route → select → call    │    │
//!                      │               └───────────┬──────────────┘    │
//!                      │                           │                   │
//!                      │        ┌──────────────────┼───────────────┐   │
//!                      │        ▼                  ▼               ▼   │
//!                      │  ┌──────────┐     ┌──────────────┐  ┌───────┐ │
//!   Client Response    │  │ routing  │     │load_balancer │  │resil- │ │
//!   ◀──────────────────│  │  table   │     │   + pool     │  │ience  │ │──▶ Upstream
//!                      │  └──────────┘     └──────────────┘  └───────┘ │    Services
//!                      │                                                │
//!                      │  ┌──────────────────────────────────────────┐ │
//!                      │  │           Cross-Cutting Concerns          │ │
//!                      │  │  config   ratelimit   cache   auth        │ │
//!                      │  │  observability   lifecycle   error        │ │
//!                      │  └──────────────────────────────────────────┘ │
//!                      └───────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod routing;

// Traffic management
pub mod cache;
pub mod load_balancer;
pub mod ratelimit;
pub mod resilience;

// Cross-cutting concerns
pub mod auth;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
