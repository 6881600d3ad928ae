//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path below the mount prefix)
//!     → router.rs (route lookup)
//!     → matcher.rs (method set + segment-boundary prefix)
//!     → Return: RouteMatch { route, suffix } or None
//!
//! Route Compilation (at startup and on config reload):
//!     RouteConfig[]
//!     → Parse targets and methods
//!     → Freeze as immutable RouteTable
//!     → Swapped in atomically by the gateway
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable afterwards
//! - No regex in hot path (prefix matching only)
//! - Longest prefix wins; config order breaks ties
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{ProxyRoute, RouteError, RouteMatch, RouteTable};
