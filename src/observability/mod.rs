//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (request ids and per-request spans)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via `tracing` fields, never formatted strings
//! - Request ID flows from the inbound call into every log line of it
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
pub mod tracing;
