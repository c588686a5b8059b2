//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use l7_balancer::config::BalancerConfig;
use l7_balancer::http::HttpServer;
use l7_balancer::lifecycle::Shutdown;
use l7_balancer::load_balancer::ServerPool;

/// A raw-TCP backend that answers every request with
/// `<name> host=<Host header>` and closes the connection.
pub struct MockBackend {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting; the port starts refusing connections.
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

pub async fn start_mock_backend(name: &'static str) -> MockBackend {
    start_mock_backend_at("127.0.0.1:0".parse().unwrap(), name).await
}

pub async fn start_mock_backend_at(addr: SocketAddr, name: &'static str) -> MockBackend {
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(respond(socket, name));
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, handle }
}

async fn respond(mut socket: TcpStream, name: &'static str) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    // Read the request head; bodies are not used by these tests.
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let host = head
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case("host").then(|| value.trim().to_string())
        })
        .unwrap_or_default();

    let body = format!("{} host={}", name, host);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Serve `pool` on an ephemeral port. Health checks are left to the caller.
pub async fn start_proxy(pool: Arc<ServerPool>) -> (SocketAddr, Shutdown) {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();

    let shutdown = Shutdown::new();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(pool, &config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// GET `/` through the proxy and return (status, body).
pub async fn get(client: &reqwest::Client, proxy: SocketAddr) -> (u16, String) {
    let res = client
        .get(format!("http://{}/", proxy))
        .send()
        .await
        .expect("proxy unreachable");
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

/// Backend name from a mock response body.
pub fn name_of(body: &str) -> &str {
    body.split(' ').next().unwrap_or_default()
}
