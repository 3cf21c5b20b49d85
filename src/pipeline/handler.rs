//! The staged request pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::http::{HeaderValue, Method};

use crate::auth::{Authenticator, Principal};
use crate::cache::{self, store, CachedResponse, ResponseCache};
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::pipeline::request::{GatewayRequest, GatewayResponse};
use crate::pipeline::upstream::UpstreamClient;
use crate::ratelimit::RateLimiter;
use crate::resilience::CircuitBreaker;
use crate::routing::{Route, RouteTable};

/// Rate-limit bucket name for paths no route matched.
const UNROUTED: &str = "unrouted";

/// How a response relates to the cache, echoed in `x-cache-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// The request pipeline and every shared component it consults.
///
/// One instance serves all requests concurrently; the route table is the
/// only piece that changes at runtime and it swaps atomically on reload.
pub struct Pipeline {
    authenticator: Arc<dyn Authenticator>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    breaker: Arc<CircuitBreaker>,
    routes: Arc<ArcSwap<RouteTable>>,
    upstream: Arc<dyn UpstreamClient>,
    gateway_id: String,
}

impl Pipeline {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        breaker: Arc<CircuitBreaker>,
        routes: Arc<ArcSwap<RouteTable>>,
        upstream: Arc<dyn UpstreamClient>,
        gateway_id: String,
    ) -> Self {
        Self {
            authenticator,
            limiter,
            cache,
            breaker,
            routes,
            upstream,
            gateway_id,
        }
    }

    /// Run one request through every stage. The first failing stage
    /// short-circuits with its error.
    pub async fn handle(&self, req: GatewayRequest) -> GatewayResult<GatewayResponse> {
        let start = Instant::now();
        let method = req.method.clone();
        let path = req.path.clone();

        let result = self.run_stages(req, start).await;

        // Rejections count toward the request rate too; only successes and
        // cache hits are recorded inside the stage chain.
        if let Err(e) = &result {
            let service = self
                .routes
                .load()
                .match_path(&path)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "none".to_string());
            metrics::record_request(method.as_str(), e.status().as_u16(), &service, start);
        }
        result
    }

    async fn run_stages(
        &self,
        req: GatewayRequest,
        start: Instant,
    ) -> GatewayResult<GatewayResponse> {
        // Stage 1: authenticate.
        let principal = self.authenticator.authenticate(&req.headers).await?;

        // In-flight requests keep the table they started with.
        let table = self.routes.load_full();
        let route = table.match_path(&req.path);

        // Stage 2: authorize against the matched route's scopes.
        if let Some(route) = &route {
            authorize(&principal, route)?;
        }

        // Stage 3: rate limit. Unrouted requests consume the default quota
        // before the 404 is returned.
        let (bucket, quota) = match &route {
            Some(route) => (route.name.as_str(), route.quota.as_ref()),
            None => (UNROUTED, None),
        };
        let decision = self.limiter.check_and_consume(&principal.id, bucket, quota);
        if !decision.allowed {
            tracing::info!(
                request_id = %req.id,
                identity = %principal.id,
                route = %bucket,
                "Request rate limited"
            );
            return Err(GatewayError::RateLimitExceeded {
                identity: principal.id,
                limit: decision.limit,
                retry_after_ms: decision.reset_after.as_millis() as u64,
            });
        }

        // Stage 4: cache lookup.
        let cache_key = route.as_ref().and_then(|route| {
            cacheable_request(&req.method, route).then(|| {
                cache::key::build(
                    &req.method,
                    &req.path,
                    req.query.as_deref(),
                    &req.headers,
                    &route.cache.vary_by_headers,
                )
            })
        });
        if let (Some(key), Some(route)) = (&cache_key, &route) {
            if let Some(cached) = self.cache.get(key) {
                let mut response = GatewayResponse {
                    status: cached.status,
                    headers: cached.headers,
                    body: cached.body,
                };
                self.decorate(&mut response, &req, route, None, CacheStatus::Hit, start);
                metrics::record_request(req.method.as_str(), response.status.as_u16(), &route.name, start);
                return Ok(response);
            }
        }

        // Stage 5: the path must resolve to a route from here on.
        let route = route.ok_or_else(|| GatewayError::RouteNotFound(req.path.clone()))?;

        // Stage 6: pick an upstream instance.
        let instance = route
            .pool
            .select()
            .ok_or_else(|| GatewayError::NoHealthyInstance(route.name.clone()))?;

        // Stage 7: guarded, time-capped upstream call. Success and failure
        // are recorded only after the call resolves; a cancelled call
        // records neither.
        let forwarded = self.forward_request(&req, &route, &principal);
        let mut response = self
            .breaker
            .execute(&route.name, &route.breaker, || async {
                match tokio::time::timeout(
                    route.timeout,
                    self.upstream.call(&route.name, &instance, &forwarded),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::UpstreamTimeout {
                        service: route.name.clone(),
                        timeout_ms: route.timeout.as_millis() as u64,
                    }),
                }
            })
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    request_id = %req.id,
                    service = %route.name,
                    error = %e,
                    "Upstream stage failed"
                );
            })?;

        instance.record_latency(start.elapsed());

        // Stage 8: store and decorate.
        let mut cache_status = CacheStatus::Bypass;
        if let Some(key) = &cache_key {
            if store::response_cacheable(&req.method, response.status, &response.headers) {
                self.cache.put(
                    key,
                    CachedResponse {
                        status: response.status,
                        headers: response.headers.clone(),
                        body: response.body.clone(),
                    },
                    Duration::from_millis(route.cache.ttl_ms),
                );
                cache_status = CacheStatus::Miss;
            }
        }

        self.decorate(&mut response, &req, &route, Some(&instance), cache_status, start);
        metrics::record_request(req.method.as_str(), response.status.as_u16(), &route.name, start);
        Ok(response)
    }

    /// Build the request actually sent upstream: caller headers plus the
    /// gateway's forwarding metadata.
    fn forward_request(
        &self,
        req: &GatewayRequest,
        route: &Route,
        principal: &Principal,
    ) -> GatewayRequest {
        let mut forwarded = req.clone();
        insert_header(&mut forwarded.headers, "x-forwarded-by", &self.gateway_id);
        insert_header(&mut forwarded.headers, "x-principal", &principal.id);
        insert_header(
            &mut forwarded.headers,
            "x-timeout-budget-ms",
            &route.timeout.as_millis().to_string(),
        );
        forwarded
    }

    /// Attach the gateway's response metadata headers.
    fn decorate(
        &self,
        response: &mut GatewayResponse,
        req: &GatewayRequest,
        route: &Route,
        instance: Option<&Arc<crate::load_balancer::instance::ServiceInstance>>,
        cache_status: CacheStatus,
        start: Instant,
    ) {
        insert_header(&mut response.headers, "x-request-id", &req.id);
        insert_header(&mut response.headers, "x-gateway-id", &self.gateway_id);
        insert_header(&mut response.headers, "x-service-name", &route.name);
        insert_header(&mut response.headers, "x-cache-status", cache_status.as_str());
        insert_header(
            &mut response.headers,
            "x-gateway-elapsed-ms",
            &start.elapsed().as_millis().to_string(),
        );
        if let Some(instance) = instance {
            insert_header(
                &mut response.headers,
                "x-gateway-instance",
                instance.address.as_str(),
            );
        }
    }
}

fn authorize(principal: &Principal, route: &Route) -> GatewayResult<()> {
    for scope in &route.required_scopes {
        if !principal.has_scope(scope) {
            tracing::info!(
                identity = %principal.id,
                service = %route.name,
                scope = %scope,
                "Authorization denied"
            );
            return Err(GatewayError::AuthorizationDenied(scope.clone()));
        }
    }
    Ok(())
}

/// Whether this request participates in caching at all.
fn cacheable_request(method: &Method, route: &Route) -> bool {
    route.cache.enabled && (method == Method::GET || method == Method::HEAD)
}

fn insert_header(headers: &mut axum::http::HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
