//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize subsystems → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast to all tasks → drain → exit
//!
//! Background (sweeper.rs):
//!     Interval tick → expire idle rate-limit records and stale cache
//!     entries → repeat until shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to every
//!   long-running task
//! - The sweeper is advisory: correctness never depends on it, it only
//!   reclaims memory that lazy expiry has not touched yet

pub mod shutdown;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use sweeper::Sweeper;
