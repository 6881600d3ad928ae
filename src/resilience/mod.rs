//! Resilience middlewares for the outbound client.
//!
//! # Data Flow
//! ```text
//! HttpClient pipeline:
//!     → timeouts.rs (force the per-request deadline)
//!     → retries.rs (re-run the rest of the chain on retryable outcomes)
//!         → backoff.rs (optional delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Both are ordinary `Middleware`s; order is whatever the config lists
//! - Retries key off the response status; connection errors only when asked
//! - Backoff is opt-in, the default is immediate bounded retry

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::RetryMiddleware;
pub use timeouts::TimeoutMiddleware;
