//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use game_gateway::config::GatewayConfig;
use game_gateway::http::GatewayServer;
use game_gateway::lifecycle::Shutdown;
use game_gateway::registry::{MemoryStore, RegistryStore};

/// Gateway config suitable for tests: passthrough naming so mock backends
/// on 127.0.0.1 are reachable, no background probes, short backoff.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.resolver.replica_naming = "passthrough".into();
    config.health_check.enabled = false;
    config.resilience.backoff_base_ms = 10;
    config.resilience.backoff_max_ms = 50;
    config
}

/// Start a gateway on an ephemeral port backed by an in-memory store.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let store: Arc<dyn RegistryStore> = Arc::new(MemoryStore::new());
    let server = GatewayServer::new(config, store, None);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the server a beat to start accepting.
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}

/// Register a service instance through the gateway's own surface.
pub async fn register_service(gateway: SocketAddr, service: &str, address: &str) {
    let client = reqwest::Client::new();
    let res = client
        .post(format!("http://{}/register", gateway))
        .json(&serde_json::json!({
            "serviceName": service,
            "serviceAddress": address,
        }))
        .send()
        .await
        .expect("gateway unreachable");
    assert!(res.status().is_success(), "registration failed: {}", res.status());
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a simple mock backend that returns a fixed response.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_programmable_backend(addr, move || async move { (200, response.to_string()) }).await;
}

/// Start a programmable mock backend with async support.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    start_routing_backend(addr, move |_path, _body| f()).await;
}

/// Start a mock backend that sees the request path and body, for
/// endpoints with per-path behavior (/prepare, /commit, /rollback).
#[allow(dead_code)]
pub async fn start_routing_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some((path, body)) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, response_body) = f(path, body).await;
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            response_body.len(),
                            response_body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Minimal HTTP/1.1 request parse: request path and body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<(String, String)> {
    let mut buf = vec![0u8; 16 * 1024];
    let mut total = 0;

    let header_end = loop {
        let n = socket.read(&mut buf[total..]).await.ok()?;
        if n == 0 {
            return None;
        }
        total += n;
        if let Some(pos) = buf[..total].windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if total == buf.len() {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = head
        .lines()
        .skip(1)
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let body_start = header_end + 4;
    while total < body_start + content_length && total < buf.len() {
        let n = socket.read(&mut buf[total..]).await.ok()?;
        if n == 0 {
            break;
        }
        total += n;
    }

    let body_end = (body_start + content_length).min(total);
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).to_string();
    Some((path, body))
}
