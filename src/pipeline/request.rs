//! Buffered request and response types carried through the pipeline.

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use uuid::Uuid;

/// A fully buffered inbound request.
///
/// The server buffers the body up to its configured cap before the pipeline
/// runs, so every stage sees an owned, re-readable request.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Correlation id, generated at ingress and echoed on every response.
    pub id: String,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayRequest {
    pub fn new(
        method: Method,
        path: String,
        query: Option<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            path,
            query,
            headers,
            body,
        }
    }
}

/// A fully buffered response on its way back to the client.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}
