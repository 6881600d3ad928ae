//! Timeout override middleware.
//!
//! # Design Decisions
//! - Replaces the request deadline unconditionally, caller value ignored
//! - Enforcement happens in the transport, which fails the call with
//!   `ClientError::Timeout` once the deadline passes

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::client::{ClientError, Middleware, Next, Request, Response};

#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::from_secs_f64(secs.max(0.0)))
    }
}

impl Middleware for TimeoutMiddleware {
    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, ClientError>> {
        next.run(req.with_timeout(self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::middleware::testing::ScriptedTransport;
    use crate::client::{header_map, Pipeline};

    #[tokio::test]
    async fn forces_configured_timeout() {
        let transport = ScriptedTransport::new(&[200]);
        let pipeline = Pipeline::new().with(TimeoutMiddleware::from_secs_f64(60.0));

        for caller_timeout in [1, 30, 600] {
            let req = Request::get("http://upstream/")
                .unwrap()
                .with_timeout(Duration::from_secs(caller_timeout));
            pipeline.run(req, &*transport).await.unwrap();
        }

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|r| r.timeout() == Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn leaves_other_fields_alone() {
        let transport = ScriptedTransport::new(&[200]);
        let pipeline = Pipeline::new().with(TimeoutMiddleware::new(Duration::from_secs(5)));
        let req = Request::post("http://upstream/items", "payload")
            .unwrap()
            .with_headers(&header_map([("x-trace", "abc")]).unwrap());

        pipeline.run(req.clone(), &*transport).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].method(), req.method());
        assert_eq!(seen[0].url(), req.url());
        assert_eq!(seen[0].headers(), req.headers());
        assert_eq!(seen[0].body(), req.body());
    }
}
