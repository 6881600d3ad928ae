//! Retry middleware.
//!
//! # Responsibilities
//! - Re-run the rest of the chain while the outcome is retryable
//! - Return the last response verbatim once retries are exhausted
//!
//! # Design Decisions
//! - Retryable statuses default to 502/503/504
//! - `max_retries` counts extra attempts: total calls ≤ 1 + max_retries
//! - Timeouts are retried like a retryable status
//! - Transport errors propagate unless `retry_on_error` is set

use futures_util::future::BoxFuture;
use http::StatusCode;

use crate::client::{ClientError, Middleware, Next, Request, Response};
use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;

/// Statuses retried when none are configured.
pub const DEFAULT_RETRY_STATUSES: [StatusCode; 3] = [
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone)]
pub struct RetryMiddleware {
    max_retries: u32,
    statuses: Vec<StatusCode>,
    backoff: Option<Backoff>,
    retry_on_error: bool,
}

impl RetryMiddleware {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            backoff: None,
            retry_on_error: false,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let mut middleware = Self::new(config.max_retries).retry_on_error(config.retry_on_error);
        if !config.statuses.is_empty() {
            middleware = middleware.with_statuses(
                config
                    .statuses
                    .iter()
                    .filter_map(|code| StatusCode::from_u16(*code).ok()),
            );
        }
        if config.backoff_base_ms > 0 {
            middleware = middleware.with_backoff(Backoff::new(config.backoff_base_ms, config.backoff_max_ms));
        }
        middleware
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn retry_on_error(mut self, enabled: bool) -> Self {
        self.retry_on_error = enabled;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, outcome: &Result<Response, ClientError>) -> bool {
        match outcome {
            Ok(response) => self.statuses.contains(&response.status()),
            Err(ClientError::Timeout(_)) => true,
            Err(e) => self.retry_on_error && e.is_connection_level(),
        }
    }
}

impl Middleware for RetryMiddleware {
    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, ClientError>> {
        Box::pin(async move {
            let mut retries = 0;
            loop {
                let outcome = next.run(req.clone()).await;
                if retries >= self.max_retries || !self.should_retry(&outcome) {
                    if retries > 0 {
                        tracing::debug!(url = %req.url(), retries, "Retry loop finished");
                    }
                    return outcome;
                }

                retries += 1;
                let delay = self.backoff.map(|b| b.delay(retries)).unwrap_or_default();
                match &outcome {
                    Ok(response) => tracing::info!(
                        url = %req.url(),
                        status = response.status().as_u16(),
                        attempt = retries,
                        delay = ?delay,
                        "Retrying request"
                    ),
                    Err(e) => tracing::info!(
                        url = %req.url(),
                        error = %e,
                        attempt = retries,
                        delay = ?delay,
                        "Retrying after transport error"
                    ),
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        })
    }
}
