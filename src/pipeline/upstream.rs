//! Upstream HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{HeaderMap, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::auth::GATEWAY_KEY_HEADER;
use crate::error::{GatewayError, GatewayResult};
use crate::load_balancer::instance::ServiceInstance;
use crate::pipeline::request::{GatewayRequest, GatewayResponse};

/// Headers that describe one hop and must not be forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// Performs the actual call to an upstream instance.
///
/// A trait seam so pipeline tests run against scripted upstreams. A 5xx
/// response is an error, not a response: it feeds the circuit breaker.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn call(
        &self,
        service: &str,
        instance: &Arc<ServiceInstance>,
        req: &GatewayRequest,
    ) -> GatewayResult<GatewayResponse>;
}

/// Hyper-backed upstream client with pooled connections.
pub struct HttpUpstream {
    client: Client<HttpConnector, Body>,
    /// Cap on buffered upstream response bodies.
    max_body_bytes: usize,
}

impl HttpUpstream {
    pub fn new(max_body_bytes: usize) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            max_body_bytes,
        }
    }

    fn build_uri(&self, instance: &ServiceInstance, req: &GatewayRequest) -> GatewayResult<Uri> {
        let path_and_query = match &req.query {
            Some(q) if !q.is_empty() => format!("{}?{}", req.path, q),
            _ => req.path.clone(),
        };

        let authority = instance
            .address
            .authority()
            .parse::<Authority>()
            .map_err(|e| GatewayError::Internal(format!("invalid instance authority: {}", e)))?;

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build upstream uri: {}", e)))
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn call(
        &self,
        service: &str,
        instance: &Arc<ServiceInstance>,
        req: &GatewayRequest,
    ) -> GatewayResult<GatewayResponse> {
        let uri = self.build_uri(instance, req)?;

        let mut builder = Request::builder().method(req.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            copy_forwardable_headers(&req.headers, headers);
        }

        let upstream_req = builder
            .body(Body::from(req.body.clone()))
            .map_err(|e| GatewayError::Internal(format!("failed to build upstream request: {}", e)))?;

        let response = self.client.request(upstream_req).await.map_err(|e| {
            GatewayError::UpstreamError {
                service: service.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::UpstreamError {
                service: service.to_string(),
                message: format!("upstream returned {}", status),
            });
        }

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| GatewayError::UpstreamError {
                service: service.to_string(),
                message: format!("failed to read upstream body: {}", e),
            })?;

        Ok(GatewayResponse {
            status,
            headers: parts.headers,
            body,
        })
    }
}

/// Copy end-to-end headers, dropping hop-by-hop headers and the gateway's
/// own credential header so it never leaks upstream.
fn copy_forwardable_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter() {
        let lowered = name.as_str().to_ascii_lowercase();
        if lowered == GATEWAY_KEY_HEADER || HOP_BY_HOP_HEADERS.contains(&lowered.as_str()) {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}
