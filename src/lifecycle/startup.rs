//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (health scheduler, config reload, admin API)
//! - Bind the gateway listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::client::{ClientError, HttpClient};
use crate::config::watcher::ConfigWatcher;
use crate::config::GatewayConfig;
use crate::health::{HealthEngine, HealthScheduler, HttpProber, InMemoryProxyStore, ProxyStore};
use crate::http::server::apply_route_updates;
use crate::http::{HttpServer, SharedRoutes};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::{RouteError, RouteTable};

/// Time background tasks get to stop after the gateway has drained.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("client: {0}")]
    Client(#[from] ClientError),
    #[error("routes: {0}")]
    Routes(#[from] RouteError),
    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),
    #[error("bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid address '{0}'")]
    Address(String),
    #[error("server: {0}")]
    Serve(std::io::Error),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address).await.map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}

/// Run the whole gateway process until SIGINT/SIGTERM.
///
/// With `config_path` set, route changes in that file are applied live.
pub async fn run(config: GatewayConfig, config_path: Option<&Path>) -> Result<(), StartupError> {
    let started_at = Instant::now();

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let client = Arc::new(HttpClient::from_config(&config.client)?);
    let routes: SharedRoutes = Arc::new(ArcSwap::from_pointee(RouteTable::from_config(&config.routes)?));
    let store: Arc<dyn ProxyStore> = Arc::new(InMemoryProxyStore::from_seeds(&config.proxies));
    let prober = Arc::new(HttpProber::from_config(&config.health));
    let engine = Arc::new(HealthEngine::new(store, prober, &config.health));
    let shutdown = Shutdown::new();

    tracing::info!(
        routes = routes.load().len(),
        proxies = config.proxies.len(),
        mount_prefix = %config.gateway.normalized_prefix(),
        "Subsystems initialized"
    );

    let scheduler = HealthScheduler::new(engine.clone(), config.health.clone());
    tokio::spawn(scheduler.run(shutdown.subscribe()));

    let _watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            tokio::spawn(apply_route_updates(routes.clone(), updates, shutdown.subscribe()));
            Some(handle)
        }
        None => None,
    };

    if config.admin.enabled {
        if config.admin.api_key == PLACEHOLDER_API_KEY {
            tracing::warn!("Admin API is using the placeholder key, set admin.api_key");
        }
        let listener = bind(&config.admin.bind_address).await?;
        let app = setup_admin_router(AdminState {
            engine: engine.clone(),
            routes: routes.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
            started_at,
        });
        let mut stop = shutdown.subscribe();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let listener = bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config.gateway, routes, client.clone());
    let serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::forward_signals(&shutdown).await;

    match serving.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(StartupError::Serve(e)),
        Err(e) => tracing::error!(error = %e, "Gateway server task failed"),
    }

    if !shutdown.drained(SHUTDOWN_GRACE).await {
        tracing::warn!(remaining = shutdown.receiver_count(), "Background tasks still running at shutdown deadline");
    }
    if let Ok(client) = Arc::try_unwrap(client) {
        client.close();
    }

    tracing::info!(uptime_secs = started_at.elapsed().as_secs(), "Shutdown complete");
    Ok(())
}
