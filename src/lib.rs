//! Reverse-proxy gateway library: pooled outbound HTTP client with a
//! middleware pipeline, the gateway that forwards through it, and the
//! forward-proxy health engine.

pub mod admin;
pub mod client;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use client::{HttpClient, Request, Response};
pub use config::GatewayConfig;
pub use health::HealthEngine;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
