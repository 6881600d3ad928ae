//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound calls by route, method, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `client_requests_total` (counter): outbound calls by method, status
//! - `client_request_duration_seconds` (histogram): outbound latency
//! - `health_sweeps_total` (counter): completed check sweeps
//! - `health_checks_total` (counter): individual proxy checks
//! - `health_proxies` (gauge): proxies per status across the whole store
//!
//! # Design Decisions
//! - Prometheus exporter serves its own HTTP listener
//! - Outbound failures are labelled `status="error"`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::{ProxyStatus, StatusCounts};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one inbound gateway call.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    ::metrics::counter!("gateway_requests_total", &labels).increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record one outbound call made by the pooled transport.
pub fn record_outbound(method: &str, status: Option<u16>, start: Instant) {
    let status = status.map(|s| s.to_string()).unwrap_or_else(|| "error".to_string());
    let labels = [("method", method.to_string()), ("status", status)];
    ::metrics::counter!("client_requests_total", &labels).increment(1);
    ::metrics::histogram!("client_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record one completed health sweep.
pub fn record_sweep(checked: usize) {
    ::metrics::counter!("health_sweeps_total").increment(1);
    ::metrics::counter!("health_checks_total").increment(checked as u64);
}

/// Publish the current number of proxies per status.
pub fn record_proxy_statuses(counts: &StatusCounts) {
    for status in [
        ProxyStatus::Active,
        ProxyStatus::Cooldown,
        ProxyStatus::Error,
        ProxyStatus::Inactive,
    ] {
        ::metrics::gauge!("health_proxies", "status" => status.to_string()).set(counts.get(status) as f64);
    }
}

/// Record a bulk status transition (cool-down, reset).
pub fn record_transition(kind: &'static str, count: usize) {
    ::metrics::counter!("health_transitions_total", "kind" => kind).increment(count as u64);
}
