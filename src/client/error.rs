//! Outbound client error taxonomy.

use std::time::Duration;

/// Errors raised by the outbound HTTP client.
///
/// A non-2xx upstream status is never an error: it comes back as a normal
/// [`Response`](super::Response). Only failures that leave no response behind
/// end up here.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection-level failure (refused, reset, DNS, proxy handshake).
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-request deadline elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body was not valid JSON for the requested type.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The transport could not be constructed from the pool settings.
    #[error("failed to build transport: {0}")]
    Build(String),

    /// The client was closed while a call was waiting for a pool slot.
    #[error("client is closed")]
    Closed,
}

impl ClientError {
    /// True for failures where no upstream answered at all.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Timeout(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ClientError::Build(err.to_string())
        } else {
            // reqwest hides the root cause behind source(); keep the chain.
            let mut msg = err.to_string();
            let mut source = std::error::Error::source(&err);
            while let Some(inner) = source {
                msg.push_str(": ");
                msg.push_str(&inner.to_string());
                source = inner.source();
            }
            ClientError::Transport(msg)
        }
    }
}
