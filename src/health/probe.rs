//! Reachability probe run through a proxy.

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::client::{HttpClient, PoolLimits};
use crate::config::HealthCheckConfig;
use crate::health::state::Proxy;

/// Checks one proxy; `Err` carries the reason recorded on the proxy.
pub trait Prober: Send + Sync {
    fn probe<'a>(&'a self, proxy: &'a Proxy) -> BoxFuture<'a, Result<(), String>>;
}

/// Fetches a known URL through the proxy with a dedicated one-slot client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    probe_url: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(probe_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            probe_url: probe_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &HealthCheckConfig) -> Self {
        Self::new(config.probe_url.clone(), Duration::from_secs(config.timeout_secs))
    }
}

impl Prober for HttpProber {
    fn probe<'a>(&'a self, proxy: &'a Proxy) -> BoxFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let client = HttpClient::builder()
                .limits(PoolLimits::new(1, 1))
                .proxy(Some(proxy.proxy_config()))
                .timeout(self.timeout)
                .build()
                .map_err(|e| e.to_string())?;

            let outcome = client.get(&self.probe_url).await;
            client.close();

            match outcome {
                Ok(response) if response.ok() => {
                    tracing::debug!(proxy = %proxy.address(), latency_ms = response.latency_ms(), "Probe succeeded");
                    Ok(())
                }
                Ok(response) => Err(format!("probe returned status {}", response.status().as_u16())),
                Err(e) => Err(e.to_string()),
            }
        })
    }
}
