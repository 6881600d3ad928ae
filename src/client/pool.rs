//! Connection pool and outbound proxy settings.
//!
//! # Responsibilities
//! - Hold abstract pool sizing (`PoolLimits`)
//! - Render it into the limits the transport is built with
//! - Render an outbound proxy (`ProxyConfig`) into a transport proxy URI

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ClientError;

/// Abstract connection pool sizing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolLimits {
    /// Ceiling on concurrent in-flight calls through one client.
    pub max_connections: usize,

    /// Idle connections kept alive per host.
    pub max_keepalive: usize,

    /// Seconds an idle connection is kept before being closed.
    pub keepalive_expiry_secs: f64,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_keepalive: 20,
            keepalive_expiry_secs: 30.0,
        }
    }
}

impl PoolLimits {
    pub fn new(max_connections: usize, max_keepalive: usize) -> Self {
        Self {
            max_connections,
            max_keepalive,
            ..Self::default()
        }
    }

    /// Limits the transport is configured with.
    ///
    /// `max_keepalive` is clamped to `max_connections`, and a zero connection
    /// ceiling is raised to one so the admission gate can ever open.
    pub fn to_transport(&self) -> TransportLimits {
        let max_connections = self.max_connections.max(1);
        if self.max_keepalive > max_connections {
            tracing::warn!(
                max_keepalive = self.max_keepalive,
                max_connections,
                "max_keepalive exceeds max_connections, clamping"
            );
        }
        let expiry = if self.keepalive_expiry_secs.is_finite() && self.keepalive_expiry_secs > 0.0 {
            Duration::from_secs_f64(self.keepalive_expiry_secs)
        } else {
            Duration::ZERO
        };
        TransportLimits {
            max_connections,
            max_keepalive_connections: self.max_keepalive.min(max_connections),
            keepalive_expiry: expiry,
        }
    }
}

/// Pool limits as consumed by the transport builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportLimits {
    pub max_connections: usize,
    pub max_keepalive_connections: usize,
    pub keepalive_expiry: Duration,
}

/// Outbound proxy every call of a client is routed through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://10.0.0.5:3128`.
    pub url: String,

    /// Optional `(username, password)` pair.
    #[serde(default)]
    pub auth: Option<(String, String)>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
        }
    }

    pub fn with_auth(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: Some((username.into(), password.into())),
        }
    }

    /// Proxy URI with credentials embedded as userinfo when auth is set.
    pub fn to_proxy_uri(&self) -> Result<Url, ClientError> {
        let mut uri = Url::parse(&self.url)?;
        match &self.auth {
            Some((user, pass)) => {
                if uri.set_username(user).is_err() || uri.set_password(Some(pass)).is_err() {
                    return Err(ClientError::Build(format!(
                        "proxy url cannot carry credentials: {}",
                        self.url
                    )));
                }
            }
            None => {
                // Credentials typed into the url itself are not honoured.
                let _ = uri.set_username("");
                let _ = uri.set_password(None);
            }
        }
        Ok(uri)
    }

    pub(crate) fn to_transport(&self) -> Result<reqwest::Proxy, ClientError> {
        let uri = self.to_proxy_uri()?;
        reqwest::Proxy::all(uri.as_str()).map_err(|e| ClientError::Build(e.to_string()))
    }
}
