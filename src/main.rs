//! Proxy gateway
//!
//! Reverse-proxy gateway with a pooled outbound client and a proxy health
//! engine, built with Tokio, Axum and reqwest.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request     ┌───────────────────────────────────────────────────────┐
//!   ──────────────────▶│  http server ──▶ routing ──▶ HttpClient pipeline ──────┼──▶ Upstream
//!                      │  (request id,     (longest    (logging, retry,         │
//!   ◀──────────────────│   trace, limits)   prefix)     timeout, pooled io)     │◀──
//!   Client Response    │                                                       │
//!                      │  health engine ──▶ probe through each forward proxy ──┼──▶ Probe URL
//!                      │  (scheduler, admin API, in-memory proxy store)        │
//!                      │                                                       │
//!                      │  config (TOML, hot reload) · observability · lifecycle│
//!                      └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use proxy_gateway::config::{load_config, GatewayConfig};
use proxy_gateway::lifecycle::startup;
use proxy_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "proxy-gateway", version, about = "Reverse-proxy gateway with proxy health checks")]
struct Args {
    /// Path to the TOML config file; defaults are used when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Do not reload routes when the config file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "proxy-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.client.pool.max_connections,
        routes = config.routes.len(),
        health_checks = config.health.enabled,
        "Configuration loaded"
    );

    let watch_path = if args.no_watch { None } else { args.config.as_deref() };
    startup::run(config, watch_path).await?;
    Ok(())
}
