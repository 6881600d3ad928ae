//! Reverse-proxy gateway subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace, limits)
//!     → strip mount prefix, look up RouteTable
//!     → request.rs (drop hop-by-hop headers, add X-Forwarded-For)
//!     → HttpClient (buffered pipeline or raw stream)
//!     → response.rs (relay upstream, or JSON envelope on gateway errors)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use response::{ApiResponse, GatewayError};
pub use server::{AppState, HttpServer, SharedRoutes};
