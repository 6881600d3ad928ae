//! Health engine with real probes, driven through the admin API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use proxy_gateway::admin::{setup_admin_router, AdminState};
use proxy_gateway::config::ProxySeed;
use proxy_gateway::health::{HealthEngine, HttpProber, InMemoryProxyStore, ProxyStatus, ProxyStore};
use proxy_gateway::routing::RouteTable;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;

mod common;

const KEY: &str = "test-admin-key";

fn seed(addr: std::net::SocketAddr) -> ProxySeed {
    ProxySeed {
        host: addr.ip().to_string(),
        port: addr.port(),
        username: None,
        password: None,
        inactive: false,
    }
}

/// Two healthy proxies (any HTTP server answering 200 will do) and one dead.
async fn engine() -> (Arc<HealthEngine>, Arc<InMemoryProxyStore>) {
    let up1 = common::start_mock_backend("ok").await;
    let up2 = common::start_mock_backend("ok").await;
    let dead = common::refused_addr().await;

    let store = Arc::new(InMemoryProxyStore::from_seeds(&[seed(up1), seed(dead), seed(up2)]));
    let prober = Arc::new(HttpProber::new("http://probe.invalid/generate_204", Duration::from_secs(2)));
    let engine = Arc::new(HealthEngine::with_limits(store.clone(), prober, 2, Duration::ZERO));
    (engine, store)
}

async fn start_admin(engine: Arc<HealthEngine>) -> String {
    let routes = Arc::new(ArcSwap::from_pointee(RouteTable::default()));
    let app = setup_admin_router(AdminState {
        engine,
        routes,
        api_key: Arc::from(KEY),
        started_at: Instant::now(),
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn sweep_through_real_proxies() {
    let (engine, store) = engine().await;

    let report = engine.check_all().await.unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.active, 2);
    assert_eq!(report.failed, 1);

    let dead = store.get(2).await.unwrap().unwrap();
    assert_eq!(dead.status, ProxyStatus::Error);
    assert!(dead.last_error.is_some());
    assert!(dead.last_checked_at.is_some());
    assert_eq!(store.get(1).await.unwrap().unwrap().status, ProxyStatus::Active);
}

#[tokio::test]
async fn admin_requires_bearer_key() {
    let (engine, _) = engine().await;
    let base = start_admin(engine).await;
    let client = reqwest::Client::new();

    let anonymous = client.get(format!("{}/admin/status", base)).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .get(format!("{}/admin/status", base))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let status: Value = client
        .get(format!("{}/admin/status", base))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "operational");
    assert_eq!(status["proxies"]["active"], 3);
}

#[tokio::test]
async fn admin_drives_the_cooldown_cycle() {
    let (engine, store) = engine().await;
    let base = start_admin(engine).await;
    let client = reqwest::Client::new();

    let report: Value = client
        .post(format!("{}/admin/proxies/check", base))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["failed"], 1);

    // Zero cooldown: the failed proxy is parked and immediately reactivated.
    let cycle: Value = client
        .post(format!("{}/admin/proxies/reset-cooldowns", base))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cycle["cooled_down"], 1);
    assert_eq!(cycle["reset"], 1);
    assert_eq!(store.list_by_status(&[ProxyStatus::Active]).await.unwrap().len(), 3);

    let proxies: Vec<Value> = client
        .get(format!("{}/admin/proxies", base))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(proxies.len(), 3);
    assert!(proxies.iter().all(|p| p.get("password").is_none()));

    let missing = client
        .post(format!("{}/admin/proxies/99/reset", base))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["msg"], "proxy 99 not found");
}
