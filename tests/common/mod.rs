//! Shared utilities for integration tests.
//!
//! Every mock upstream binds an ephemeral port and speaks raw HTTP/1.1 with
//! `Connection: close`, so tests never share sockets.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use proxy_gateway::config::GatewayConfig;
use proxy_gateway::http::SharedRoutes;
use proxy_gateway::lifecycle::Shutdown;
use proxy_gateway::routing::RouteTable;
use proxy_gateway::{HttpClient, HttpServer};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by a mock upstream.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read the request line, headers and a `Content-Length` body.
pub async fn read_request(socket: &mut TcpStream) -> Option<RawRequest> {
    let mut reader = BufReader::new(socket);
    let mut line = String::new();
    reader.read_line(&mut line).await.ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.ok()?;

    Some(RawRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn status_line(status: u16) -> String {
    let reason = http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    format!("HTTP/1.1 {} {}", status, reason)
}

async fn write_response(socket: &mut TcpStream, status: u16, extra_headers: &str, body: &str) {
    let response = format!(
        "{}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
        status_line(status),
        body.len(),
        extra_headers,
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn listen() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Upstream answering every call with 200 and a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_req| async move { (200, response.to_string()) }).await
}

/// Upstream whose status and body come from `f`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RawRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let (listener, addr) = listen().await;
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Some(req) = read_request(&mut socket).await else { return };
                let (status, body) = f(req).await;
                write_response(&mut socket, status, "", &body).await;
            });
        }
    });
    addr
}

/// Upstream echoing the request it received as JSON, with an extra
/// hop-by-hop header on the way back.
pub async fn start_echo_backend() -> SocketAddr {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Some(req) = read_request(&mut socket).await else { return };
                let headers: serde_json::Map<String, serde_json::Value> = req
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                let body = serde_json::json!({
                    "method": req.method,
                    "target": req.target,
                    "headers": headers,
                    "body": req.body,
                })
                .to_string();
                write_response(
                    &mut socket,
                    200,
                    "Content-Type: application/json\r\nKeep-Alive: timeout=5\r\nX-Upstream: echo\r\n",
                    &body,
                )
                .await;
            });
        }
    });
    addr
}

/// Upstream sending `chunks` with chunked encoding, pausing between them.
pub async fn start_chunked_backend(chunks: Vec<&'static str>, pause: Duration) -> SocketAddr {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let chunks = chunks.clone();
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_none() {
                    return;
                }
                let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Type: text/plain\r\nX-Stream: yes\r\nConnection: close\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in chunks {
                    let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                    if socket.write_all(frame.as_bytes()).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(pause).await;
                }
                let _ = socket.write_all(b"0\r\n\r\n").await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Upstream that reads the request and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let (listener, addr) = listen().await;
    drop(listener);
    addr
}

/// A running gateway built from `config`.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub routes: SharedRoutes,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let client = Arc::new(HttpClient::from_config(&config.client).unwrap());
    let routes: SharedRoutes = Arc::new(arc_swap::ArcSwap::from_pointee(
        RouteTable::from_config(&config.routes).unwrap(),
    ));
    let shutdown = Shutdown::new();

    let (listener, addr) = listen().await;
    let server = HttpServer::new(&config.gateway, routes.clone(), client);
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestGateway { addr, routes, shutdown }
}
