//! Proxy persistence seam.

use std::collections::BTreeMap;

use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use crate::config::ProxySeed;
use crate::health::state::{Proxy, ProxyStatus};
use crate::health::HealthError;

/// Where proxies live between sweeps.
pub trait ProxyStore: Send + Sync {
    fn all(&self) -> BoxFuture<'_, Result<Vec<Proxy>, HealthError>>;

    fn list_by_status<'a>(&'a self, statuses: &'a [ProxyStatus]) -> BoxFuture<'a, Result<Vec<Proxy>, HealthError>>;

    fn get(&self, id: u64) -> BoxFuture<'_, Result<Option<Proxy>, HealthError>>;

    /// Write back health fields of every given proxy as one unit.
    fn commit(&self, updates: Vec<Proxy>) -> BoxFuture<'_, Result<(), HealthError>>;
}

/// Store backed by a map behind a single lock.
#[derive(Debug, Default)]
pub struct InMemoryProxyStore {
    proxies: RwLock<BTreeMap<u64, Proxy>>,
}

impl InMemoryProxyStore {
    pub fn new(proxies: impl IntoIterator<Item = Proxy>) -> Self {
        Self {
            proxies: RwLock::new(proxies.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    /// Seed rows get ids 1..=n in config order.
    pub fn from_seeds(seeds: &[ProxySeed]) -> Self {
        Self::new(
            seeds
                .iter()
                .enumerate()
                .map(|(i, seed)| Proxy::from_seed(i as u64 + 1, seed)),
        )
    }
}

impl ProxyStore for InMemoryProxyStore {
    fn all(&self) -> BoxFuture<'_, Result<Vec<Proxy>, HealthError>> {
        Box::pin(async move { Ok(self.proxies.read().await.values().cloned().collect()) })
    }

    fn list_by_status<'a>(&'a self, statuses: &'a [ProxyStatus]) -> BoxFuture<'a, Result<Vec<Proxy>, HealthError>> {
        Box::pin(async move {
            Ok(self
                .proxies
                .read()
                .await
                .values()
                .filter(|p| statuses.contains(&p.status))
                .cloned()
                .collect())
        })
    }

    fn get(&self, id: u64) -> BoxFuture<'_, Result<Option<Proxy>, HealthError>> {
        Box::pin(async move { Ok(self.proxies.read().await.get(&id).cloned()) })
    }

    fn commit(&self, updates: Vec<Proxy>) -> BoxFuture<'_, Result<(), HealthError>> {
        Box::pin(async move {
            let mut proxies = self.proxies.write().await;
            if let Some(missing) = updates.iter().find(|p| !proxies.contains_key(&p.id)) {
                return Err(HealthError::NotFound(missing.id));
            }
            for update in updates {
                if let Some(stored) = proxies.get_mut(&update.id) {
                    stored.status = update.status;
                    stored.last_error = update.last_error;
                    stored.last_checked_at = update.last_checked_at;
                }
            }
            Ok(())
        })
    }
}
