//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, pool sizes, concurrency)
//! - Check route targets and methods parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use http::Method;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }

    if config.gateway.request_timeout_secs == 0 {
        errors.push(ValidationError::new("gateway.request_timeout_secs", "must be at least 1"));
    }

    let client = &config.client;
    if client.pool.max_connections == 0 {
        errors.push(ValidationError::new("client.pool.max_connections", "must be at least 1"));
    }
    if !client.pool.keepalive_expiry_secs.is_finite() || client.pool.keepalive_expiry_secs < 0.0 {
        errors.push(ValidationError::new("client.pool.keepalive_expiry_secs", "must be >= 0"));
    }
    if !client.timeout_secs.is_finite() || client.timeout_secs <= 0.0 {
        errors.push(ValidationError::new("client.timeout_secs", "must be > 0"));
    }
    if let Some(secs) = client.timeout_override_secs {
        if !secs.is_finite() || secs <= 0.0 {
            errors.push(ValidationError::new("client.timeout_override_secs", "must be > 0"));
        }
    }
    if let Some(proxy) = &client.proxy {
        if let Err(e) = proxy.to_proxy_uri() {
            errors.push(ValidationError::new("client.proxy.url", e.to_string()));
        }
    }
    for code in &client.retry.statuses {
        if !(100..=599).contains(code) {
            errors.push(ValidationError::new("client.retry.statuses", format!("{} is not an HTTP status", code)));
        }
    }

    let mut names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(&field, format!("duplicate route name '{}'", route.name)));
        }
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(format!("{}.path", field), "must start with '/'"));
        }
        match Url::parse(&route.target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                format!("{}.target", field),
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(format!("{}.target", field), e.to_string())),
        }
        for method in &route.methods {
            if method.parse::<Method>().is_err() {
                errors.push(ValidationError::new(format!("{}.methods", field), format!("invalid method '{}'", method)));
            }
        }
    }

    for (i, proxy) in config.proxies.iter().enumerate() {
        if proxy.host.trim().is_empty() {
            errors.push(ValidationError::new(format!("proxies[{}].host", i), "must not be empty"));
        }
        if proxy.port == 0 {
            errors.push(ValidationError::new(format!("proxies[{}].port", i), "must not be 0"));
        }
    }

    let health = &config.health;
    if health.concurrency == 0 {
        errors.push(ValidationError::new("health.concurrency", "must be at least 1"));
    }
    if health.interval_secs == 0 {
        errors.push(ValidationError::new("health.interval_secs", "must be at least 1"));
    }
    if health.timeout_secs == 0 {
        errors.push(ValidationError::new("health.timeout_secs", "must be at least 1"));
    }
    if health.cooldown_interval_secs == 0 {
        errors.push(ValidationError::new("health.cooldown_interval_secs", "must be at least 1"));
    }
    if Url::parse(&health.probe_url).is_err() {
        errors.push(ValidationError::new("health.probe_url", "not a valid url"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }
    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("admin.bind_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
