//! End-to-end tests over real sockets: gateway in front of mock upstreams.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::net::TcpListener;

use edge_gateway::config::schema::{
    CacheRouteConfig, GatewayConfig, InstanceConfig, RateQuotaConfig, ServiceRouteConfig,
};
use edge_gateway::{GatewayServer, Shutdown};

async fn start_gateway(
    config: GatewayConfig,
) -> (
    String,
    std::sync::Arc<Shutdown>,
    tokio::sync::mpsc::UnboundedSender<GatewayConfig>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = std::sync::Arc::new(Shutdown::new());
    let server = GatewayServer::new(config);
    let (reload_tx, reload_rx) = tokio::sync::mpsc::unbounded_channel();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, reload_rx, &server_shutdown).await;
    });

    // Give the listener a moment to start serving.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (format!("http://{}", addr), shutdown, reload_tx)
}

fn config_with_backend(backend: std::net::SocketAddr) -> GatewayConfig {
    GatewayConfig {
        routes: vec![ServiceRouteConfig {
            name: "echo".to_string(),
            path_prefix: "/api/echo".to_string(),
            instances: vec![InstanceConfig {
                address: format!("http://{}", backend),
                weight: 1,
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn proxies_to_the_upstream_and_decorates() {
    let (backend, hits) = common::start_mock_backend("hello from upstream").await;
    let (base, _shutdown, _reload_tx) = start_gateway(config_with_backend(backend)).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/echo/greeting", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(
        response.headers().get("x-service-name").unwrap(),
        "echo"
    );
    assert_eq!(response.text().await.unwrap(), "hello from upstream");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_path_returns_structured_404() {
    let (backend, _hits) = common::start_mock_backend("unused").await;
    let (base, _shutdown, _reload_tx) = start_gateway(config_with_backend(backend)).await;

    let response = reqwest::get(format!("{}/definitely/not/routed", base))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "ROUTE_NOT_FOUND");
}

#[tokio::test]
async fn status_endpoint_reports_routes_and_instances() {
    let (backend, _hits) = common::start_mock_backend("ok").await;
    let (base, _shutdown, _reload_tx) = start_gateway(config_with_backend(backend)).await;

    let response = reqwest::get(format!("{}/gateway/status", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["routes"][0]["name"], "echo");
    assert_eq!(body["routes"][0]["instances"][0]["health"], "unknown");

    let response = reqwest::get(format!("{}/gateway/cache", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = reqwest::get(format!("{}/gateway/ratelimit", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn rate_limited_requests_get_retry_after() {
    let (backend, hits) = common::start_mock_backend("ok").await;
    let mut config = config_with_backend(backend);
    config.routes[0].rate_limit = Some(RateQuotaConfig {
        requests_per_window: 2,
        window_ms: 60_000,
    });
    let (base, _shutdown, _reload_tx) = start_gateway(config).await;

    let client = reqwest::Client::new();
    for _ in 0..2 {
        let response = client
            .get(format!("{}/api/echo", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = client
        .get(format!("{}/api/echo", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    assert!(response.headers().get("retry-after").is_some());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn slow_upstreams_time_out_with_gateway_timeout() {
    let (backend, hits) = common::start_slow_backend("late", Duration::from_millis(300)).await;
    let mut config = config_with_backend(backend);
    config.routes[0].timeout_ms = 50;
    let (base, _shutdown, _reload_tx) = start_gateway(config).await;

    let response = reqwest::get(format!("{}/api/echo", base)).await.unwrap();

    assert_eq!(response.status(), 504);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "UPSTREAM_TIMEOUT");
    assert_eq!(hits.load(Ordering::SeqCst), 1, "upstream was reached, then abandoned");
}

#[tokio::test]
async fn config_reload_swaps_routes_and_preserves_state() {
    let (backend, hits) = common::start_mock_backend("ok").await;

    let instance = |addr: std::net::SocketAddr| InstanceConfig {
        address: format!("http://{}", addr),
        weight: 1,
    };
    let echo = ServiceRouteConfig {
        name: "echo".to_string(),
        path_prefix: "/api/echo".to_string(),
        instances: vec![instance(backend)],
        rate_limit: Some(RateQuotaConfig {
            requests_per_window: 2,
            window_ms: 60_000,
        }),
        ..Default::default()
    };
    let reports = ServiceRouteConfig {
        name: "reports".to_string(),
        path_prefix: "/api/reports".to_string(),
        instances: vec![instance(backend)],
        cache: CacheRouteConfig {
            enabled: true,
            ttl_ms: 60_000,
            vary_by_headers: Vec::new(),
        },
        ..Default::default()
    };
    let config = GatewayConfig {
        routes: vec![echo, reports],
        ..Default::default()
    };
    let (base, _shutdown, reload_tx) = start_gateway(config.clone()).await;
    let client = reqwest::Client::new();

    // Prime the cache and exhaust the echo quota before the reload.
    let response = client
        .get(format!("{}/api/reports", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-cache-status").unwrap(), "MISS");
    for _ in 0..2 {
        let response = client.get(format!("{}/api/echo", base)).send().await.unwrap();
        assert_eq!(response.status(), 200);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    // Reload with an extra route; no requests are in flight.
    let admin = ServiceRouteConfig {
        name: "admin".to_string(),
        path_prefix: "/api/admin".to_string(),
        instances: vec![instance(backend)],
        ..Default::default()
    };
    let mut reloaded = config;
    reloaded.routes.push(admin);
    reload_tx.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // The new route table is live.
    let response = client.get(format!("{}/api/admin", base)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("x-service-name").unwrap(), "admin");
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    // Cached entries from before the reload still serve.
    let response = client
        .get(format!("{}/api/reports", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-cache-status").unwrap(), "HIT");
    assert_eq!(hits.load(Ordering::SeqCst), 4, "hit never touches the backend");

    // The exhausted quota carries across as well.
    let response = client.get(format!("{}/api/echo", base)).send().await.unwrap();
    assert_eq!(response.status(), 429);
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}
