//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new GatewayConfig sent to main
//!     → route table swapped atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Only the route table is hot-reloaded; pool, listener and health
//!   settings need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, ClientConfig, GatewayConfig, GatewaySettings, HealthCheckConfig, ListenerConfig,
    ObservabilityConfig, ProxySeed, RetryConfig, RouteConfig,
};
pub use validation::ValidationError;
