//! Proxy entity and its health state machine.
//!
//! # States
//! - ACTIVE: proxy passed its last check (or was reset)
//! - ERROR: proxy failed its last check
//! - COOLDOWN: failed proxy parked until the cooldown period elapses
//! - INACTIVE: disabled, never checked
//!
//! # State Transitions
//! ```text
//! ACTIVE/COOLDOWN → ACTIVE: check succeeded
//! ACTIVE/COOLDOWN → ERROR:  check failed
//! ERROR → COOLDOWN:         cool-down sweep
//! COOLDOWN → ACTIVE:        cooldown elapsed since last check, or explicit reset
//! ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ProxyConfig;
use crate::config::ProxySeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyStatus {
    Active,
    Cooldown,
    Error,
    Inactive,
}

impl fmt::Display for ProxyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProxyStatus::Active => "ACTIVE",
            ProxyStatus::Cooldown => "COOLDOWN",
            ProxyStatus::Error => "ERROR",
            ProxyStatus::Inactive => "INACTIVE",
        };
        f.write_str(s)
    }
}

/// Number of proxies in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub cooldown: usize,
    pub error: usize,
    pub inactive: usize,
}

impl StatusCounts {
    pub fn tally<'a>(proxies: impl IntoIterator<Item = &'a Proxy>) -> Self {
        let mut counts = Self::default();
        for proxy in proxies {
            match proxy.status {
                ProxyStatus::Active => counts.active += 1,
                ProxyStatus::Cooldown => counts.cooldown += 1,
                ProxyStatus::Error => counts.error += 1,
                ProxyStatus::Inactive => counts.inactive += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: ProxyStatus) -> usize {
        match status {
            ProxyStatus::Active => self.active,
            ProxyStatus::Cooldown => self.cooldown,
            ProxyStatus::Error => self.error,
            ProxyStatus::Inactive => self.inactive,
        }
    }
}

/// A forward proxy tracked by the health engine.
///
/// Only `status`, `last_error` and `last_checked_at` are ever written by the
/// engine; the connection fields belong to whoever registered the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    pub id: u64,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub status: ProxyStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Proxy {
    pub fn new(id: u64, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
            username: None,
            password: None,
            status: ProxyStatus::Active,
            last_checked_at: None,
            last_error: None,
        }
    }

    pub fn from_seed(id: u64, seed: &ProxySeed) -> Self {
        Self {
            username: seed.username.clone(),
            password: seed.password.clone(),
            status: if seed.inactive {
                ProxyStatus::Inactive
            } else {
                ProxyStatus::Active
            },
            ..Self::new(id, seed.host.clone(), seed.port)
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Outbound proxy settings for a client routed through this proxy.
    pub fn proxy_config(&self) -> ProxyConfig {
        let url = format!("http://{}", self.address());
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => ProxyConfig::with_auth(url, user.clone(), pass.clone()),
            _ => ProxyConfig::new(url),
        }
    }

    pub fn mark_active(&mut self, at: DateTime<Utc>) {
        self.status = ProxyStatus::Active;
        self.last_error = None;
        self.last_checked_at = Some(at);
    }

    pub fn mark_error(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.status = ProxyStatus::Error;
        self.last_error = Some(reason.into());
        self.last_checked_at = Some(at);
    }

    /// Whether a COOLDOWN proxy has waited long enough to be reset.
    /// A proxy that was never checked is always eligible.
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self.last_checked_at {
            Some(checked) => now - checked >= cooldown,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_update_error_and_timestamp() {
        let now = Utc::now();
        let mut proxy = Proxy::new(1, "10.0.0.1", 3128);

        proxy.mark_error("connect timeout", now);
        assert_eq!(proxy.status, ProxyStatus::Error);
        assert_eq!(proxy.last_error.as_deref(), Some("connect timeout"));
        assert_eq!(proxy.last_checked_at, Some(now));

        proxy.mark_active(now);
        assert_eq!(proxy.status, ProxyStatus::Active);
        assert!(proxy.last_error.is_none());
    }

    #[test]
    fn cooldown_eligibility() {
        let now = Utc::now();
        let mut proxy = Proxy::new(1, "10.0.0.1", 3128);
        assert!(proxy.cooldown_elapsed(now, Duration::seconds(600)));

        proxy.last_checked_at = Some(now - Duration::seconds(60));
        assert!(!proxy.cooldown_elapsed(now, Duration::seconds(600)));
        assert!(proxy.cooldown_elapsed(now, Duration::seconds(60)));
    }

    #[test]
    fn proxy_config_carries_credentials() {
        let mut proxy = Proxy::new(1, "10.0.0.1", 3128);
        assert_eq!(proxy.proxy_config().auth, None);

        proxy.username = Some("u".into());
        proxy.password = Some("p".into());
        let config = proxy.proxy_config();
        assert_eq!(config.url, "http://10.0.0.1:3128");
        assert_eq!(config.auth, Some(("u".into(), "p".into())));
    }

    #[test]
    fn tally_covers_every_status() {
        let mut rows: Vec<Proxy> = (1..=5).map(|i| Proxy::new(i, "h", 1)).collect();
        rows[1].status = ProxyStatus::Error;
        rows[2].status = ProxyStatus::Cooldown;
        rows[3].status = ProxyStatus::Inactive;

        let counts = StatusCounts::tally(&rows);
        assert_eq!(counts, StatusCounts { active: 2, cooldown: 1, error: 1, inactive: 1 });
        assert_eq!(counts.get(ProxyStatus::Error), 1);
        assert_eq!(StatusCounts::tally(&Vec::<Proxy>::new()), StatusCounts::default());
    }

    #[test]
    fn status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&ProxyStatus::Cooldown).unwrap(), "\"COOLDOWN\"");
        assert_eq!(ProxyStatus::Error.to_string(), "ERROR");
    }
}
