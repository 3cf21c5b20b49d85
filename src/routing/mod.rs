//! Route resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Config load / reload:
//!     → table.rs builds an immutable RouteTable from the route list
//!     → the table is swapped in atomically; in-flight requests keep the
//!       table they started with
//! Per request:
//!     → table.rs match_path: longest configured prefix wins
//! ```

pub mod table;

pub use table::{Route, RouteTable};
