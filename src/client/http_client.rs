//! Pooled HTTP client.
//!
//! # Responsibilities
//! - Own one pooled transport for the client's lifetime
//! - Run buffered calls through the middleware pipeline
//! - Open streaming calls that hold their connection until dropped
//! - Bound in-flight calls to `max_connections`
//!
//! # Design Decisions
//! - Connections are released by `Drop` on every exit path; `close()` also
//!   fails calls still waiting for a slot
//! - Streaming calls bypass the middleware chain (a middleware produces a
//!   buffered `Response`), but still use the pool and the admission gate
//! - A streaming call's timeout applies to the head and to every gap between
//!   chunks, so a stalled upstream frees its pool slot

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{StreamExt, TryStreamExt};
use http::{HeaderMap, Method};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use super::middleware::{LoggingMiddleware, Pipeline, Transport};
use super::model::{header_map, merge_headers, DEFAULT_TIMEOUT};
use super::pool::{PoolLimits, ProxyConfig, TransportLimits};
use super::{ChunkStream, ClientError, Request, Response};
use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::resilience::{RetryMiddleware, TimeoutMiddleware};

/// reqwest-backed terminal transport with an admission gate.
#[derive(Debug, Clone)]
pub struct PooledTransport {
    inner: reqwest::Client,
    gate: Arc<Semaphore>,
    limits: TransportLimits,
}

impl PooledTransport {
    pub fn new(limits: &PoolLimits, proxy: Option<&ProxyConfig>) -> Result<Self, ClientError> {
        let limits = limits.to_transport();
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(limits.max_keepalive_connections)
            .pool_idle_timeout(limits.keepalive_expiry)
            .no_proxy();
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy.to_transport()?);
        }
        let inner = builder.build().map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            inner,
            gate: Arc::new(Semaphore::new(limits.max_connections)),
            limits,
        })
    }

    pub fn limits(&self) -> TransportLimits {
        self.limits
    }

    /// Free pool slots right now.
    pub fn available(&self) -> usize {
        self.gate.available_permits()
    }

    async fn admit(&self) -> Result<OwnedSemaphorePermit, ClientError> {
        self.gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ClientError::Closed)
    }

    fn build(&self, req: &Request) -> reqwest::RequestBuilder {
        self.inner
            .request(req.method().clone(), req.url().clone())
            .headers(req.headers().clone())
            .body(req.body().clone())
    }

    async fn execute(&self, req: Request) -> Result<Response, ClientError> {
        let _permit = self.admit().await?;
        let start = Instant::now();
        let deadline = req.timeout();
        let call = async {
            let response = self.build(&req).send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, ClientError>((status, headers, body))
        };

        let outcome = match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(deadline)),
        };
        metrics::record_outbound(req.method().as_str(), outcome.as_ref().ok().map(|o| o.0.as_u16()), start);

        let (status, headers, body) = outcome?;
        Ok(Response::new(status, headers, body, start.elapsed(), Arc::new(req)))
    }

    /// Send `req` and hand back its body as a chunk stream once the head
    /// arrives. The timeout bounds the wait for the head and then each wait
    /// for the next chunk.
    pub async fn open(&self, req: Request) -> Result<ChunkStream, ClientError> {
        let permit = self.admit().await?;
        let start = Instant::now();
        let deadline = req.timeout();

        let response = match tokio::time::timeout(deadline, self.build(&req).send()).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::Timeout(deadline)),
        };
        metrics::record_outbound(
            req.method().as_str(),
            response.as_ref().ok().map(|r| r.status().as_u16()),
            start,
        );
        let response = response?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(ClientError::from).boxed();
        Ok(ChunkStream::new(status, headers, body, Some(permit)).with_idle_timeout(deadline))
    }

    fn close(&self) {
        self.gate.close();
    }
}

impl Transport for PooledTransport {
    fn send(&self, req: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(self.execute(req))
    }
}

/// HTTP client with default headers, a middleware pipeline and a pool.
#[derive(Debug)]
pub struct HttpClient {
    transport: PooledTransport,
    pipeline: Pipeline,
    default_headers: HeaderMap,
    default_timeout: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client as configured in the `[client]` section.
    ///
    /// Pipeline order, outermost first: logging, retry, forced timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut pipeline = Pipeline::new();
        if config.log_requests {
            pipeline = pipeline.with(LoggingMiddleware);
        }
        if config.retry.enabled && config.retry.max_retries > 0 {
            pipeline = pipeline.with(RetryMiddleware::from_config(&config.retry));
        }
        if let Some(secs) = config.timeout_override_secs {
            pipeline = pipeline.with(TimeoutMiddleware::from_secs_f64(secs));
        }

        Self::builder()
            .limits(config.pool.clone())
            .proxy(config.proxy.clone())
            .default_headers(header_map(&config.default_headers)?)
            .timeout(config.timeout())
            .pipeline(pipeline)
            .build()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn transport(&self) -> &PooledTransport {
        &self.transport
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub async fn get(&self, url: &str) -> Result<Response, ClientError> {
        self.request(Request::new(
            Method::GET,
            Url::parse(url)?,
            HeaderMap::new(),
            Bytes::new(),
            self.default_timeout,
        ))
        .await
    }

    pub async fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<Response, ClientError> {
        self.request(Request::new(
            Method::POST,
            Url::parse(url)?,
            HeaderMap::new(),
            body,
            self.default_timeout,
        ))
        .await
    }

    /// Run `req` through the pipeline. Non-2xx statuses are `Ok`.
    pub async fn request(&self, req: Request) -> Result<Response, ClientError> {
        let req = self.prepare(req);
        self.pipeline.run(req, &self.transport).await
    }

    /// Open a streaming call using the client's default timeout.
    pub async fn stream(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: impl Into<Bytes>,
    ) -> Result<ChunkStream, ClientError> {
        let req = Request::new(method, Url::parse(url)?, headers.clone(), body, self.default_timeout);
        self.stream_request(req).await
    }

    pub async fn stream_request(&self, req: Request) -> Result<ChunkStream, ClientError> {
        self.transport.open(self.prepare(req)).await
    }

    /// Close the pool. Calls waiting for a slot fail with `Closed`; open
    /// streams keep their connection until dropped.
    pub fn close(self) {
        self.transport.close();
        tracing::debug!("HTTP client closed");
    }

    /// Default headers go underneath the per-call ones.
    fn prepare(&self, req: Request) -> Request {
        if self.default_headers.is_empty() {
            return req;
        }
        let mut headers = self.default_headers.clone();
        merge_headers(&mut headers, req.headers());
        Request::new(
            req.method().clone(),
            req.url().clone(),
            headers,
            req.body().clone(),
            req.timeout(),
        )
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    limits: PoolLimits,
    proxy: Option<ProxyConfig>,
    default_headers: HeaderMap,
    timeout: Duration,
    pipeline: Pipeline,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            limits: PoolLimits::default(),
            proxy: None,
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            pipeline: Pipeline::new(),
        }
    }
}

impl HttpClientBuilder {
    pub fn limits(mut self, limits: PoolLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn build(self) -> Result<HttpClient, ClientError> {
        let transport = PooledTransport::new(&self.limits, self.proxy.as_ref())?;
        tracing::debug!(
            max_connections = transport.limits().max_connections,
            max_keepalive = transport.limits().max_keepalive_connections,
            proxied = self.proxy.is_some(),
            middlewares = self.pipeline.len(),
            "HTTP client built"
        );
        Ok(HttpClient {
            transport,
            pipeline: self.pipeline,
            default_headers: self.default_headers,
            default_timeout: self.timeout,
        })
    }
}
