//! End-to-end gateway tests: reqwest → gateway → raw TCP upstream.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use proxy_gateway::config::{GatewayConfig, RouteConfig};
use proxy_gateway::routing::RouteTable;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

fn route(name: &str, path: &str, target: String) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        path: path.into(),
        methods: vec![],
        target,
        streaming: false,
    }
}

fn config_with(routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routes = routes;
    config.health.enabled = false;
    config.client.log_requests = false;
    config
}

fn base(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

#[tokio::test]
async fn unknown_path_gets_404_envelope() {
    let upstream = common::start_mock_backend("never").await;
    let gateway = common::start_gateway(config_with(vec![route("crawler", "/crawler", base(upstream))])).await;

    let res = reqwest::get(gateway.url("/proxy/unknown/thing")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 404);
    assert_eq!(body["msg"], "No proxy route found for path: /proxy/unknown/thing");
    assert!(body["data"].is_null());

    let outside = reqwest::get(gateway.url("/crawler")).await.unwrap();
    assert_eq!(outside.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn buffered_route_rewrites_path_and_filters_headers() {
    let upstream = common::start_echo_backend().await;
    let gateway = common::start_gateway(config_with(vec![route(
        "crawler",
        "/crawler",
        format!("{}/api", base(upstream)),
    )]))
    .await;

    let client = reqwest::Client::new();
    let res = client
        .post(gateway.url("/proxy/crawler/jobs?depth=2"))
        .header("x-request-id", "req-42")
        .header("x-custom", "kept")
        .header("proxy-authorization", "Basic c2VjcmV0")
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-upstream").unwrap(), "echo");
    assert!(res.headers().get("keep-alive").is_none());
    assert_eq!(res.headers().get("x-request-id").unwrap(), "req-42");

    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["target"], "/api/jobs?depth=2");
    assert_eq!(echoed["body"], "payload");
    assert_eq!(echoed["headers"]["x-custom"], "kept");
    assert_eq!(echoed["headers"]["x-request-id"], "req-42");
    assert_eq!(echoed["headers"]["x-forwarded-for"], "127.0.0.1");
    assert!(echoed["headers"].get("proxy-authorization").is_none());
    assert_eq!(echoed["headers"]["host"], upstream.to_string());
}

#[tokio::test]
async fn longest_prefix_and_method_filter() {
    let general = common::start_mock_backend("general").await;
    let jobs = common::start_mock_backend("jobs").await;
    let mut jobs_route = route("jobs", "/crawler/jobs/*", base(jobs));
    jobs_route.methods = vec!["GET".into()];
    let gateway = common::start_gateway(config_with(vec![route("crawler", "/crawler", base(general)), jobs_route])).await;

    let client = reqwest::Client::new();
    let get = client.get(gateway.url("/proxy/crawler/jobs/1")).send().await.unwrap();
    assert_eq!(get.text().await.unwrap(), "jobs");

    let delete = client.delete(gateway.url("/proxy/crawler/jobs/1")).send().await.unwrap();
    assert_eq!(delete.text().await.unwrap(), "general");
}

#[tokio::test]
async fn upstream_errors_are_relayed_verbatim() {
    let upstream = common::start_programmable_backend(|_| async { (500, "upstream exploded".to_string()) }).await;
    let gateway = common::start_gateway(config_with(vec![route("svc", "/svc", base(upstream))])).await;

    let res = reqwest::get(gateway.url("/proxy/svc/boom")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "upstream exploded");
}

#[tokio::test]
async fn retries_service_unavailable_through_gateway() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let upstream = common::start_programmable_backend(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                (503, "busy".to_string())
            } else {
                (200, "done".to_string())
            }
        }
    })
    .await;
    let gateway = common::start_gateway(config_with(vec![route("svc", "/svc", base(upstream))])).await;

    let res = reqwest::get(gateway.url("/proxy/svc")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "done");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn streaming_route_preserves_chunk_order() {
    let upstream = common::start_chunked_backend(vec!["chunk1", "chunk2", "chunk3"], Duration::from_millis(50)).await;
    let mut feed = route("feed", "/feed", base(upstream));
    feed.streaming = true;
    let gateway = common::start_gateway(config_with(vec![feed])).await;

    let mut res = reqwest::get(gateway.url("/proxy/feed")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-stream").unwrap(), "yes");

    let mut received = Vec::new();
    while let Some(chunk) = res.chunk().await.unwrap() {
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, b"chunk1chunk2chunk3");
}

#[tokio::test]
async fn stalled_stream_is_cut_off_by_timeout() {
    let upstream = common::start_chunked_backend(vec!["first", "second"], Duration::from_secs(5)).await;
    let mut feed = route("feed", "/feed", base(upstream));
    feed.streaming = true;
    let mut config = config_with(vec![feed]);
    config.client.timeout_secs = 0.3;
    let gateway = common::start_gateway(config).await;

    let start = Instant::now();
    let res = reqwest::get(gateway.url("/proxy/feed")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await;

    assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
    assert!(body.map(|b| b != "firstsecond").unwrap_or(true));
}

#[tokio::test]
async fn dot_segments_cannot_escape_route_target() {
    let upstream = common::start_echo_backend().await;
    let gateway = common::start_gateway(config_with(vec![route(
        "crawler",
        "/crawler",
        format!("{}/api", base(upstream)),
    )]))
    .await;

    for path in ["/proxy/crawler/../../admin/secret", "/proxy/crawler/%2e%2e/admin"] {
        let mut socket = TcpStream::connect(gateway.addr).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: gateway\r\nConnection: close\r\n\r\n", path);
        socket.write_all(request.as_bytes()).await.unwrap();

        let mut raw = String::new();
        socket.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 404"), "{} answered: {}", path, raw);
        assert!(raw.contains("No proxy route found for path"));
    }
}

#[tokio::test]
async fn refused_upstream_maps_to_502_envelope() {
    let dead = common::refused_addr().await;
    let gateway = common::start_gateway(config_with(vec![route("dead", "/dead", base(dead))])).await;

    let res = reqwest::get(gateway.url("/proxy/dead")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 502);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn slow_upstream_maps_to_504_envelope() {
    let silent = common::start_silent_backend().await;
    let mut config = config_with(vec![route("slow", "/slow", base(silent))]);
    config.client.timeout_secs = 0.3;
    config.client.retry.enabled = false;
    let gateway = common::start_gateway(config).await;

    let res = reqwest::get(gateway.url("/proxy/slow")).await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 504);
}

#[tokio::test]
async fn swapped_route_table_takes_effect() {
    let first = common::start_mock_backend("first").await;
    let second = common::start_mock_backend("second").await;
    let gateway = common::start_gateway(config_with(vec![route("svc", "/svc", base(first))])).await;

    assert_eq!(reqwest::get(gateway.url("/proxy/svc")).await.unwrap().text().await.unwrap(), "first");

    let table = RouteTable::from_config(&[route("svc", "/svc", base(second))]).unwrap();
    gateway.routes.store(Arc::new(table));
    assert_eq!(reqwest::get(gateway.url("/proxy/svc")).await.unwrap().text().await.unwrap(), "second");
}

#[tokio::test]
async fn root_mount_prefix() {
    let upstream = common::start_mock_backend("rooted").await;
    let mut config = config_with(vec![route("svc", "/svc", base(upstream))]);
    config.gateway.mount_prefix = "/".into();
    let gateway = common::start_gateway(config).await;

    let res = reqwest::get(gateway.url("/svc/x")).await.unwrap();
    assert_eq!(res.text().await.unwrap(), "rooted");
}
