//! Outbound HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! Request (immutable value)
//!     → http_client.rs (default headers merged underneath)
//!     → middleware.rs (retry / timeout / logging chain)
//!     → PooledTransport (admission gate → reqwest pool → upstream)
//!     → Response (buffered) or ChunkStream (streamed)
//! ```
//!
//! # Design Decisions
//! - Values are immutable; changes are expressed as derivations
//! - One transport (and one pool) per client instance, shared by all calls
//! - A non-2xx status is a response, only connection failures are errors

mod error;
mod http_client;
pub mod middleware;
mod model;
pub mod pool;
mod stream;

pub use error::ClientError;
pub use http_client::{HttpClient, HttpClientBuilder, PooledTransport};
pub use middleware::{LoggingMiddleware, Middleware, Next, Pipeline, Transport};
pub use model::{header_map, merge_headers, Request, Response, StreamChunk, DEFAULT_TIMEOUT};
pub use pool::{PoolLimits, ProxyConfig, TransportLimits};
pub use stream::ChunkStream;
