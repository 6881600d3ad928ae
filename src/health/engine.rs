//! Proxy health engine.
//!
//! # Responsibilities
//! - Check every ACTIVE/COOLDOWN proxy with bounded concurrency
//! - Move failed proxies into cool-down and aged ones back to ACTIVE
//! - Commit each sweep's updates as a single store write

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};

use crate::config::HealthCheckConfig;
use crate::health::probe::Prober;
use crate::health::state::{Proxy, ProxyStatus, StatusCounts};
use crate::health::store::ProxyStore;
use crate::health::HealthError;
use crate::observability::metrics;

/// Outcome of one `check_all` sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub active: usize,
    pub failed: usize,
}

pub struct HealthEngine {
    store: Arc<dyn ProxyStore>,
    prober: Arc<dyn Prober>,
    concurrency: usize,
    cooldown: chrono::Duration,
    sweep: Mutex<()>,
}

impl HealthEngine {
    pub fn new(store: Arc<dyn ProxyStore>, prober: Arc<dyn Prober>, config: &HealthCheckConfig) -> Self {
        Self::with_limits(
            store,
            prober,
            config.concurrency,
            Duration::from_secs(config.cooldown_secs),
        )
    }

    pub fn with_limits(
        store: Arc<dyn ProxyStore>,
        prober: Arc<dyn Prober>,
        concurrency: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            prober,
            concurrency: concurrency.max(1),
            cooldown: chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::days(36_500)),
            sweep: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProxyStore> {
        &self.store
    }

    /// Probe every ACTIVE and COOLDOWN proxy, at most `concurrency` at once.
    ///
    /// Probe failures, timeouts and panics land on the proxy as ERROR; only a
    /// store failure makes the sweep itself fail. Sweeps never overlap.
    pub async fn check_all(&self) -> Result<SweepReport, HealthError> {
        let _sweep = self.sweep.lock().await;
        let candidates = self
            .store
            .list_by_status(&[ProxyStatus::Active, ProxyStatus::Cooldown])
            .await?;
        if candidates.is_empty() {
            tracing::debug!("No proxies to check");
            return Ok(SweepReport::default());
        }

        tracing::info!(proxies = candidates.len(), concurrency = self.concurrency, "Health sweep starting");
        let gate = Arc::new(Semaphore::new(self.concurrency));

        // A slot is taken before each spawn, so at most `concurrency` check
        // tasks exist at any time.
        let mut checks = Vec::with_capacity(candidates.len());
        for proxy in candidates {
            let handle = match gate.clone().acquire_owned().await {
                Ok(permit) => {
                    let prober = self.prober.clone();
                    let target = proxy.clone();
                    Some(tokio::spawn(async move {
                        let _permit = permit;
                        prober.probe(&target).await
                    }))
                }
                Err(_) => None,
            };
            checks.push((proxy, handle));
        }
        let outcomes = join_all(checks.into_iter().map(|(proxy, handle)| async move {
            let outcome = match handle {
                Some(handle) => handle.await.map_err(|e| format!("check aborted: {}", e)),
                None => Err("check gate closed".to_string()),
            };
            (proxy, outcome)
        }))
        .await;

        let now = Utc::now();
        let mut report = SweepReport::default();
        let mut updates = Vec::with_capacity(outcomes.len());
        for (mut proxy, outcome) in outcomes {
            report.checked += 1;
            match outcome {
                Ok(Ok(())) => {
                    proxy.mark_active(now);
                    report.active += 1;
                }
                Ok(Err(reason)) => {
                    tracing::warn!(proxy_id = proxy.id, proxy = %proxy.address(), error = %reason, "Proxy check failed");
                    proxy.mark_error(reason, now);
                    report.failed += 1;
                }
                Err(reason) => {
                    tracing::error!(proxy_id = proxy.id, proxy = %proxy.address(), error = %reason, "Proxy check task failed");
                    proxy.mark_error(reason, now);
                    report.failed += 1;
                }
            }
            updates.push(proxy);
        }

        self.store.commit(updates).await?;
        metrics::record_sweep(report.checked);
        self.publish_status_counts().await;
        tracing::info!(
            checked = report.checked,
            active = report.active,
            failed = report.failed,
            "Health sweep finished"
        );
        Ok(report)
    }

    async fn publish_status_counts(&self) {
        match self.store.all().await {
            Ok(proxies) => metrics::record_proxy_statuses(&StatusCounts::tally(&proxies)),
            Err(e) => tracing::warn!(error = %e, "Could not read proxies for status gauges"),
        }
    }

    /// COOLDOWN proxies whose last check is older than the cooldown → ACTIVE.
    pub async fn reset_cooldowns(&self) -> Result<usize, HealthError> {
        let now = Utc::now();
        let updates: Vec<Proxy> = self
            .store
            .list_by_status(&[ProxyStatus::Cooldown])
            .await?
            .into_iter()
            .filter(|p| p.cooldown_elapsed(now, self.cooldown))
            .map(|mut p| {
                p.status = ProxyStatus::Active;
                p.last_error = None;
                p
            })
            .collect();

        let count = updates.len();
        if count > 0 {
            self.store.commit(updates).await?;
            metrics::record_transition("cooldown_reset", count);
            self.publish_status_counts().await;
            tracing::info!(count, "Cooled-down proxies reactivated");
        }
        Ok(count)
    }

    /// ERROR proxies → COOLDOWN. `last_error` and `last_checked_at` are kept.
    pub async fn cool_down_errors(&self) -> Result<usize, HealthError> {
        let updates: Vec<Proxy> = self
            .store
            .list_by_status(&[ProxyStatus::Error])
            .await?
            .into_iter()
            .map(|mut p| {
                p.status = ProxyStatus::Cooldown;
                p
            })
            .collect();

        let count = updates.len();
        if count > 0 {
            self.store.commit(updates).await?;
            metrics::record_transition("cool_down", count);
            self.publish_status_counts().await;
            tracing::info!(count, "Failed proxies moved to cooldown");
        }
        Ok(count)
    }

    /// Force one proxy back to ACTIVE with its error cleared.
    pub async fn reset_proxy(&self, id: u64) -> Result<Proxy, HealthError> {
        let mut proxy = self.store.get(id).await?.ok_or(HealthError::NotFound(id))?;
        proxy.status = ProxyStatus::Active;
        proxy.last_error = None;
        self.store.commit(vec![proxy.clone()]).await?;
        self.publish_status_counts().await;
        tracing::info!(proxy_id = id, "Proxy reset to ACTIVE");
        Ok(proxy)
    }
}
