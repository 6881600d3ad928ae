//! Immutable request/response values.
//!
//! # Design Decisions
//! - Fields are private and there are no setters: a value cannot be changed
//!   after construction, only derived from
//! - Derivations (`with_*`) clone and return a new value
//! - A response keeps a shared handle to the request that produced it
//!
//! ```compile_fail
//! use proxy_gateway::client::Request;
//!
//! let mut req = Request::get("http://example.com/").unwrap();
//! req.timeout = std::time::Duration::from_secs(1);
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::ClientError;

/// Timeout applied when a request is built without an explicit one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single outbound HTTP call.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    timeout: Duration,
}

impl Request {
    pub fn new(
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        timeout: Duration,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body: body.into(),
            timeout,
        }
    }

    /// Bodyless request with default headers and timeout.
    pub fn bare(method: Method, url: Url) -> Self {
        Self::new(method, url, HeaderMap::new(), Bytes::new(), DEFAULT_TIMEOUT)
    }

    pub fn get(url: &str) -> Result<Self, ClientError> {
        Ok(Self::bare(Method::GET, Url::parse(url)?))
    }

    pub fn post(url: &str, body: impl Into<Bytes>) -> Result<Self, ClientError> {
        Ok(Self::new(
            Method::POST,
            Url::parse(url)?,
            HeaderMap::new(),
            body,
            DEFAULT_TIMEOUT,
        ))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// New request whose headers are `self.headers` with `overrides` laid on
    /// top. A name present in `overrides` replaces every existing value.
    pub fn with_headers(&self, overrides: &HeaderMap) -> Self {
        let mut next = self.clone();
        merge_headers(&mut next.headers, overrides);
        next
    }

    /// New request differing only in its timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }
}

/// Overlay `overrides` onto `base`, override wins per header name.
pub fn merge_headers(base: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        base.remove(name);
        for value in overrides.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
}

/// Build a header map from string pairs, rejecting invalid names or values.
pub fn header_map<I, K, V>(pairs: I) -> Result<HeaderMap, ClientError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes())
            .map_err(|e| ClientError::InvalidHeader(format!("{}: {}", name.as_ref(), e)))?;
        let value = HeaderValue::from_str(value.as_ref())
            .map_err(|e| ClientError::InvalidHeader(format!("{}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// The buffered result of a [`Request`].
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    latency: Duration,
    request: Arc<Request>,
}

impl Response {
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        latency: Duration,
        request: Arc<Request>,
    ) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            latency,
            request,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }

    /// The request that produced this response.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// True for 2xx and 3xx statuses.
    pub fn ok(&self) -> bool {
        (200..400).contains(&self.status.as_u16())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Split into parts for relaying; the request handle is dropped.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

/// One piece of a streamed response.
///
/// The first chunk of a stream carries the response head; every later chunk
/// carries data only.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    data: Bytes,
    status: Option<StatusCode>,
    headers: Option<HeaderMap>,
}

impl StreamChunk {
    pub fn head(data: impl Into<Bytes>, status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            data: data.into(),
            status: Some(status),
            headers: Some(headers),
        }
    }

    pub fn data_only(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            status: None,
            headers: None,
        }
    }

    pub fn is_first(&self) -> bool {
        self.status.is_some()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}
