//! Gateway-generated responses.
//!
//! # Responsibilities
//! - JSON envelope `{code, msg, data}` for everything the gateway answers itself
//! - Map outbound client failures to 502 / 504
//!
//! # Design Decisions
//! - Upstream responses, including non-2xx, are relayed verbatim, never wrapped
//! - "No route" is an ordinary 404 envelope, not an error log

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::client::ClientError;

/// JSON envelope used for gateway-originated bodies.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl ApiResponse<()> {
    pub fn error(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            msg: msg.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Failures the gateway answers on the upstream's behalf.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("No proxy route found for path: {0}")]
    NoRoute(String),

    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("cannot build upstream url: {0}")]
    UpstreamUrl(#[from] url::ParseError),

    #[error(transparent)]
    Upstream(#[from] ClientError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRoute(_) => StatusCode::NOT_FOUND,
            GatewayError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::UpstreamUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Upstream(ClientError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            GatewayError::Upstream(ClientError::Timeout(_)) => format!("Upstream timed out: {}", self),
            GatewayError::Upstream(_) => format!("Upstream request failed: {}", self),
            _ => self.to_string(),
        };
        ApiResponse::error(status, msg).into_response()
    }
}
