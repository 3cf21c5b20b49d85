//! Gateway error taxonomy.
//!
//! Every pipeline stage failure maps to a distinct variant with a stable
//! machine-readable code and an HTTP status. Nothing is silently downgraded
//! to a generic 500 except [`GatewayError::Internal`], which is logged with
//! full context and returned without leaking details.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result alias used across the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// All failure modes a request can hit inside the pipeline.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("authorization denied: missing required scope '{0}'")]
    AuthorizationDenied(String),

    #[error("rate limit exceeded for '{identity}': {limit} requests per window")]
    RateLimitExceeded {
        identity: String,
        limit: u32,
        /// Milliseconds until the current window closes.
        retry_after_ms: u64,
    },

    #[error("no route matches path '{0}'")]
    RouteNotFound(String),

    #[error("no healthy instance for service '{0}'")]
    NoHealthyInstance(String),

    #[error("circuit open for service '{service}' ({failures} recent failures)")]
    CircuitOpen { service: String, failures: u32 },

    #[error("upstream call to '{service}' timed out after {timeout_ms}ms")]
    UpstreamTimeout { service: String, timeout_ms: u64 },

    #[error("upstream error from '{service}': {message}")]
    UpstreamError { service: String, message: String },

    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            GatewayError::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            GatewayError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            GatewayError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            GatewayError::NoHealthyInstance(_) => "NO_HEALTHY_INSTANCE",
            GatewayError::CircuitOpen { .. } => "CIRCUIT_OPEN",
            GatewayError::UpstreamTimeout { .. } => "UPSTREAM_TIMEOUT",
            GatewayError::UpstreamError { .. } => "UPSTREAM_ERROR",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            GatewayError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::NoHealthyInstance(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this failure counts toward the circuit breaker.
    ///
    /// Client mistakes (auth, unknown route) and routine throttling are not
    /// infrastructure failures and must never trip the breaker.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            GatewayError::UpstreamTimeout { .. } | GatewayError::UpstreamError { .. }
        )
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal details stay in the logs.
            GatewayError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal pipeline error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": self.code(),
            "message": message,
        });

        let mut response = Response::new(Body::from(body.to_string()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        // Machine-readable retry guidance for throttling. Circuit-open gets
        // none: the breaker's own timer governs recovery.
        if let GatewayError::RateLimitExceeded { retry_after_ms, .. } = &self {
            let secs = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, v);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_distinct_per_stage() {
        assert_eq!(
            GatewayError::AuthenticationFailed("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::RouteNotFound("/x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::CircuitOpen { service: "s".into(), failures: 3 }.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::UpstreamTimeout { service: "s".into(), timeout_ms: 10 }.status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn only_upstream_failures_count_as_infrastructure() {
        assert!(GatewayError::UpstreamTimeout { service: "s".into(), timeout_ms: 10 }
            .is_infrastructure());
        assert!(GatewayError::UpstreamError { service: "s".into(), message: "boom".into() }
            .is_infrastructure());
        assert!(!GatewayError::AuthenticationFailed("x".into()).is_infrastructure());
        assert!(!GatewayError::RouteNotFound("/x".into()).is_infrastructure());
        assert!(!GatewayError::RateLimitExceeded {
            identity: "a".into(),
            limit: 1,
            retry_after_ms: 100
        }
        .is_infrastructure());
    }
}
