//! Proxy health subsystem.
//!
//! # Data Flow
//! ```text
//! Check sweep (engine.rs):
//!     scheduler tick or admin call
//!     → store.rs: select ACTIVE + COOLDOWN proxies
//!     → probe.rs: fetch the probe URL through each proxy (≤ K in flight)
//!     → state.rs: ACTIVE on success, ERROR + reason on failure
//!     → store.rs: commit every update in one write
//!
//! Cool-down sweeps (engine.rs):
//!     ERROR → COOLDOWN            (cool_down_errors)
//!     COOLDOWN → ACTIVE once aged (reset_cooldowns)
//! ```
//!
//! # Design Decisions
//! - One proxy's failure (error, timeout or panic) never aborts its siblings
//! - Probe failures are recorded on the proxy, never returned as errors
//! - Store and prober are traits so a database or fake can be plugged in

pub mod engine;
pub mod probe;
pub mod scheduler;
pub mod state;
pub mod store;

pub use engine::{HealthEngine, SweepReport};
pub use probe::{HttpProber, Prober};
pub use scheduler::HealthScheduler;
pub use state::{Proxy, ProxyStatus, StatusCounts};
pub use store::{InMemoryProxyStore, ProxyStore};

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("proxy {0} not found")]
    NotFound(u64),
}
