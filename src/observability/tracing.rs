//! Request correlation.
//!
//! # Responsibilities
//! - Generate a UUID v4 request id for inbound calls that carry none
//! - Open one span per inbound call carrying that id

use axum::body::Body;
use http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

pub const X_REQUEST_ID: &str = "x-request-id";

/// UUID v4 request ids for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request id of an inbound call, or `"unknown"` before the id layer ran.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Span for `TraceLayer::make_span_with`.
pub fn request_span(request: &Request<Body>) -> ::tracing::Span {
    ::tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request),
    )
}
