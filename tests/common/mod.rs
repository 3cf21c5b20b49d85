//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock upstream on an ephemeral port returning a fixed body.
///
/// Returns the bound address and a counter of requests served.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, Arc<AtomicU32>) {
    start_backend(body, Duration::ZERO).await
}

/// Start a mock upstream that sleeps before responding, for timeout tests.
pub async fn start_slow_backend(
    body: &'static str,
    delay: Duration,
) -> (SocketAddr, Arc<AtomicU32>) {
    start_backend(body, delay).await
}

async fn start_backend(body: &'static str, delay: Duration) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let hits_inner = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let hits = hits_inner.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        hits.fetch_add(1, Ordering::SeqCst);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}
