//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use edge_dispatcher::config::{DispatcherConfig, StaticInstanceConfig, StaticServiceConfig};
use edge_dispatcher::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start a raw TCP backend that answers every request with `response` verbatim.
///
/// Returns the bound address and a counter of accepted connections.
pub async fn start_raw_backend(response: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, accepted)
}

/// Read until the end of the request head so the peer never sees a reset.
async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// Start an axum backend that echoes the request.
///
/// The response body is the request body; headers report what the backend saw:
/// `x-backend`, `x-echo-method`, `x-echo-uri`, `x-echo-host`, `x-echo-request-id`.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move |request: Request<Body>| async move {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };

        Response::builder()
            .header("x-backend", name)
            .header("x-echo-method", parts.method.as_str())
            .header("x-echo-uri", parts.uri.to_string())
            .header("x-echo-host", header("host"))
            .header("x-echo-request-id", header("x-request-id"))
            .header("x-echo-forwarded-for", header("x-forwarded-for"))
            .body(Body::from(bytes))
            .unwrap()
    });

    serve(app).await
}

/// Serve an arbitrary axum app on an ephemeral port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A static service whose single instance lists `endpoints`.
pub fn service(name: &str, endpoints: &[String]) -> StaticServiceConfig {
    StaticServiceConfig {
        name: name.to_string(),
        instances: vec![StaticInstanceConfig {
            id: format!("{}-1", name),
            endpoints: endpoints.to_vec(),
        }],
    }
}

/// `rest://` endpoint string for a local address.
pub fn rest(addr: SocketAddr) -> String {
    format!("rest://{}", addr)
}

/// A running dispatcher.
pub struct Dispatcher {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<DispatcherConfig>,
}

impl Dispatcher {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the dispatcher with `config` on an ephemeral port.
pub async fn start_dispatcher(mut config: DispatcherConfig) -> Dispatcher {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    Dispatcher {
        addr,
        shutdown,
        config_updates,
    }
}

/// Client without connection pooling or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
