//! The identity-resolution seam.

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::error::GatewayResult;

/// Header carrying the gateway credential. Internal to the gateway and
/// stripped before any request is forwarded upstream.
pub const GATEWAY_KEY_HEADER: &str = "x-gateway-key";

/// The authenticated identity associated with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable identity used for authorization and rate-limit keying.
    pub id: String,

    /// Permission set granted to this principal.
    pub scopes: Vec<String>,
}

impl Principal {
    /// The identity used when authentication is disabled.
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".to_string(),
            scopes: Vec::new(),
        }
    }

    /// Whether this principal carries the given scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Resolves request credentials to a principal and permission set.
///
/// Treated as an external collaborator: the pipeline only consumes the
/// resolved principal and never inspects credentials itself.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the request's identity, or fail with `AuthenticationFailed`.
    async fn authenticate(&self, headers: &HeaderMap) -> GatewayResult<Principal>;
}
