//! Middleware pipeline for outbound calls.
//!
//! # Data Flow
//! ```text
//! HttpClient::request(req)
//!     → middleware[0].handle(req, next)
//!         → middleware[1].handle(req', next)
//!             → ...
//!                 → Transport::send(req'')   (terminal)
//! ```
//!
//! # Design Decisions
//! - A pipeline is an explicit ordered list; index 0 is outermost
//! - `Next` is `Copy` so a middleware may call the rest of the chain more
//!   than once (retries)
//! - Middlewares only see `Request`/`Response` values, never the transport

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;

use super::{ClientError, Request, Response};

/// Terminal step of a pipeline: actually performs the call.
pub trait Transport: Send + Sync {
    fn send(&self, req: Request) -> BoxFuture<'_, Result<Response, ClientError>>;
}

/// A behaviour wrapped around the rest of the chain.
pub trait Middleware: Send + Sync {
    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, ClientError>>;
}

/// The remainder of the chain after the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub fn run(self, req: Request) -> BoxFuture<'a, Result<Response, ClientError>> {
        match self.chain.split_first() {
            Some((current, rest)) => current.handle(
                req,
                Next {
                    chain: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.send(req),
        }
    }
}

/// Ordered middleware list folded around a terminal transport.
#[derive(Clone, Default)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it runs inside every middleware added before it.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn run<'a>(&'a self, req: Request, terminal: &'a dyn Transport) -> BoxFuture<'a, Result<Response, ClientError>> {
        Next {
            chain: &self.middlewares,
            terminal,
        }
        .run(req)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Adapts an async closure into a [`Transport`]. Mostly useful in tests.
pub struct FnTransport<F>(pub F);

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, ClientError>> + Send + 'static,
{
    fn send(&self, req: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin((self.0)(req))
    }
}

/// Logs method, url, status and latency of every call that passes through.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, ClientError>> {
        Box::pin(async move {
            let method = req.method().clone();
            let url = req.url().clone();
            let start = Instant::now();

            let result = next.run(req).await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => tracing::info!(
                    method = %method,
                    url = %url,
                    status = response.status().as_u16(),
                    latency_ms,
                    "Outbound request"
                ),
                Err(e) => tracing::warn!(
                    method = %method,
                    url = %url,
                    latency_ms,
                    error = %e,
                    "Outbound request failed"
                ),
            }
            result
        })
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::testing::ScriptedTransport;
    use super::*;
    use crate::client::header_map;

    /// Records its name on the way in and on the way out.
    struct Tag {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Tag {
        fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, ClientError>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("in:{}", self.name));
                let req = req.with_headers(&header_map([(format!("x-{}", self.name), "1")])?);
                let res = next.run(req).await;
                self.log.lock().unwrap().push(format!("out:{}", self.name));
                res
            })
        }
    }

    #[tokio::test]
    async fn composes_outer_to_inner() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(Tag { name: "a", log: log.clone() })
            .with(Tag { name: "b", log: log.clone() });
        let transport = ScriptedTransport::new(&[200]);

        let res = pipeline
            .run(Request::get("http://upstream/").unwrap(), &*transport)
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        assert_eq!(*log.lock().unwrap(), vec!["in:a", "in:b", "out:b", "out:a"]);
        let seen = transport.seen.lock().unwrap();
        assert!(seen[0].headers().contains_key("x-a"));
        assert!(seen[0].headers().contains_key("x-b"));
    }

    #[tokio::test]
    async fn empty_pipeline_goes_straight_to_transport() {
        let transport = ScriptedTransport::new(&[204]);
        let res = Pipeline::new()
            .run(Request::get("http://upstream/").unwrap(), &*transport)
            .await
            .unwrap();
        assert_eq!(res.status(), 204);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn logging_leaves_request_and_response_untouched() {
        let transport = ScriptedTransport::new(&[418]);
        let req = Request::get("http://upstream/tea").unwrap();
        let res = Pipeline::new()
            .with(LoggingMiddleware)
            .run(req.clone(), &*transport)
            .await
            .unwrap();

        assert_eq!(res.status(), 418);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].url(), req.url());
        assert_eq!(seen[0].headers(), req.headers());
        assert_eq!(seen[0].timeout(), req.timeout());
    }
}
