//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{PoolLimits, ProxyConfig};

/// Root configuration for the gateway process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Inbound gateway behaviour.
    pub gateway: GatewaySettings,

    /// Outbound HTTP client used for forwarding.
    pub client: ClientConfig,

    /// Ordered route table. Order breaks ties between equal prefixes.
    pub routes: Vec<RouteConfig>,

    /// Proxy rows seeding the in-memory proxy store.
    pub proxies: Vec<ProxySeed>,

    /// Proxy health engine settings.
    pub health: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Inbound side of the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Path prefix the gateway is mounted under ("" or "/" = root).
    pub mount_prefix: String,

    /// Largest inbound body forwarded, in bytes.
    pub max_body_bytes: usize,

    /// Total time allowed for one inbound call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            mount_prefix: "/proxy".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 120,
        }
    }
}

impl GatewaySettings {
    /// Mount prefix without a trailing slash; empty for the root.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.mount_prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection pool sizing.
    pub pool: PoolLimits,

    /// Default per-request timeout in seconds.
    pub timeout_secs: f64,

    /// Force this timeout on every call via the timeout middleware.
    pub timeout_override_secs: Option<f64>,

    /// Headers sent with every outbound call unless overridden per call.
    pub default_headers: BTreeMap<String, String>,

    /// Optional proxy all forwarded traffic goes through.
    pub proxy: Option<ProxyConfig>,

    /// Retry policy.
    pub retry: RetryConfig,

    /// Log every outbound call.
    pub log_requests: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool: PoolLimits::default(),
            timeout_secs: 30.0,
            timeout_override_secs: None,
            default_headers: BTreeMap::new(),
            proxy: None,
            retry: RetryConfig::default(),
            log_requests: true,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable the retry middleware.
    pub enabled: bool,

    /// Extra attempts after the first call.
    pub max_retries: u32,

    /// Statuses that trigger a retry; empty = 502, 503, 504.
    pub statuses: Vec<u16>,

    /// Base delay for exponential backoff in milliseconds, 0 = no backoff.
    pub backoff_base_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub backoff_max_ms: u64,

    /// Also retry connection failures; timeouts are always retried.
    pub retry_on_error: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            statuses: vec![502, 503, 504],
            backoff_base_ms: 0,
            backoff_max_ms: 2000,
            retry_on_error: false,
        }
    }
}

/// Route configuration mapping a path prefix to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match, e.g. "/crawler" or "/crawler/*".
    pub path: String,

    /// Allowed methods; empty = any.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Upstream base URL the remaining path is appended to.
    pub target: String,

    /// Pipe the upstream body through as it arrives.
    #[serde(default)]
    pub streaming: bool,
}

/// A proxy row as an admin collaborator would have stored it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxySeed {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Start out INACTIVE (never checked) instead of ACTIVE.
    #[serde(default)]
    pub inactive: bool,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Run the built-in scheduler.
    pub enabled: bool,

    /// Seconds between check sweeps.
    pub interval_secs: u64,

    /// URL fetched through each proxy.
    pub probe_url: String,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum checks in flight at once.
    pub concurrency: usize,

    /// Seconds a proxy stays in COOLDOWN before it may be reset.
    pub cooldown_secs: u64,

    /// Seconds between cool-down sweeps.
    pub cooldown_interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            probe_url: "http://www.gstatic.com/generate_204".to_string(),
            timeout_secs: 10,
            concurrency: 10,
            cooldown_secs: 600,
            cooldown_interval_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), `RUST_LOG` wins.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
