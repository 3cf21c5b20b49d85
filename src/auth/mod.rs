//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request headers
//!     → authenticator.rs (Authenticator trait, external collaborator seam)
//!     → Principal { id, scopes }
//!     → pipeline authorizes against the matched route's required scopes
//! ```
//!
//! # Design Decisions
//! - Identity resolution is a black box behind the Authenticator trait;
//!   the gateway only consumes a principal and a permission set
//! - Rate limiting keys on the resolved principal, not the raw peer address
//! - The gateway credential header is stripped before forwarding upstream

pub mod api_key;
pub mod authenticator;

pub use api_key::ApiKeyAuthenticator;
pub use authenticator::{Authenticator, Principal, GATEWAY_KEY_HEADER};
