//! HTTP server setup and the proxy entry point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::ApiKeyAuthenticator;
use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::http::status;
use crate::lifecycle::Sweeper;
use crate::pipeline::{GatewayRequest, HttpUpstream, Pipeline};
use crate::ratelimit::RateLimiter;
use crate::resilience::CircuitBreaker;
use crate::routing::RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<ResponseCache>,
    pub breaker: Arc<CircuitBreaker>,
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub config: Arc<ArcSwap<GatewayConfig>>,
    pub started_at: Instant,
    pub max_body_bytes: usize,
}

/// The gateway HTTP server and all its shared components.
pub struct GatewayServer {
    router: Router,
    state: AppState,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let cache = Arc::new(ResponseCache::new(&config.cache));
        let breaker = Arc::new(CircuitBreaker::new());
        let routes = Arc::new(ArcSwap::from_pointee(RouteTable::from_config(&config)));
        let authenticator = Arc::new(ApiKeyAuthenticator::from_config(&config.auth));
        let upstream = Arc::new(HttpUpstream::new(config.listener.max_body_bytes));

        let pipeline = Arc::new(Pipeline::new(
            authenticator,
            limiter.clone(),
            cache.clone(),
            breaker.clone(),
            routes.clone(),
            upstream,
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        ));

        let max_body_bytes = config.listener.max_body_bytes;
        let request_timeout = Duration::from_millis(config.listener.request_timeout_ms);

        let state = AppState {
            pipeline,
            limiter,
            cache,
            breaker,
            routes,
            config: Arc::new(ArcSwap::from_pointee(config)),
            started_at: Instant::now(),
            max_body_bytes,
        };

        let router = Self::build_router(state.clone(), request_timeout);
        Self { router, state }
    }

    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/gateway/status", get(status::gateway_status))
            .route("/gateway/ratelimit", get(status::ratelimit_status))
            .route("/gateway/cache", get(status::cache_status))
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until shutdown, applying config updates as they
    /// arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: &crate::lifecycle::Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        // Config reload task: swap the route table, keep everything else.
        let reload_state = self.state.clone();
        let mut reload_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => {
                        match update {
                            Some(config) => apply_reload(&reload_state, config),
                            None => break,
                        }
                    }
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        // Expiry sweeper.
        let config = self.state.config.load_full();
        let sweeper = Sweeper::new(
            self.state.limiter.clone(),
            self.state.cache.clone(),
            Duration::from_millis(config.sweep_interval_ms.max(1)),
        );
        let sweeper_shutdown = shutdown.subscribe();
        tokio::spawn(sweeper.run(sweeper_shutdown));

        let mut serve_shutdown = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = serve_shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Apply a reloaded configuration. The route table swaps atomically;
/// in-flight requests finish against the table they started with.
/// Listener and auth changes are not applied at runtime.
fn apply_reload(state: &AppState, config: GatewayConfig) {
    let previous = state.config.load_full();
    if previous.listener.bind_address != config.listener.bind_address {
        tracing::warn!(
            "Listener address changed in config; restart required to apply"
        );
    }
    if previous.auth != config.auth {
        tracing::warn!("Auth config changed; restart required to apply");
    }

    state
        .routes
        .store(Arc::new(RouteTable::from_config(&config)));
    let route_count = config.routes.len();
    state.config.store(Arc::new(config));
    tracing::info!(routes = route_count, "Configuration reloaded");
}

/// Main proxy handler. Buffers the request and hands it to the pipeline.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let query = parts.uri.query().map(str::to_string);
    let req = GatewayRequest::new(
        parts.method,
        parts.uri.path().to_string(),
        query,
        parts.headers,
        body,
    );
    let request_id = req.id.clone();

    let mut response = match state.pipeline.handle(req).await {
        Ok(ok) => {
            let mut response = Response::builder()
                .status(ok.status)
                .body(Body::from(ok.body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
            *response.headers_mut() = ok.headers;
            response
        }
        Err(e) => e.into_response(),
    };

    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
