//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline, before the upstream call:
//!     → key.rs builds the cache key (method + path + query + vary headers)
//!     → store.rs get: fresh entry short-circuits the pipeline (HIT)
//! Pipeline, after a successful upstream call:
//!     → store.rs response_cacheable gates at write time
//!     → store.rs put: insert with TTL, evicting LRU entries if over budget
//! ```
//!
//! # Design Decisions
//! - Expiry is lazy: a stale entry is discarded on the read that finds it,
//!   plus a periodic sweep so untouched entries do not pin memory
//! - Eviction is synchronous at insert time; the budget is never exceeded
//!   between operations
//! - Cacheability is decided when storing, not when serving: an entry in
//!   the cache is always safe to serve until it expires

pub mod key;
pub mod store;

pub use store::{CacheStats, CachedResponse, ResponseCache};
