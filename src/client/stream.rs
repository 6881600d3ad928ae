//! Lazy chunk stream over a streamed upstream response.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use http::{HeaderMap, StatusCode};
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::{Instant, Sleep};

use super::{ClientError, StreamChunk};

/// A non-restartable sequence of [`StreamChunk`]s.
///
/// The first item always carries the response head. The pool slot (and the
/// underlying connection) is held until the stream ends or is dropped.
/// With an idle timeout set, waiting longer than that for the next chunk
/// ends the stream with [`ClientError::Timeout`].
pub struct ChunkStream {
    head: Option<(StatusCode, HeaderMap)>,
    body: BoxStream<'static, Result<Bytes, ClientError>>,
    done: bool,
    idle_timeout: Option<Duration>,
    idle: Option<Pin<Box<Sleep>>>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl ChunkStream {
    pub(crate) fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: BoxStream<'static, Result<Bytes, ClientError>>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        Self {
            head: Some((status, headers)),
            body,
            done: false,
            idle_timeout: None,
            idle: None,
            _permit: permit,
        }
    }

    /// Fail the stream if no chunk arrives within `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Stream over already-known chunks, without a pool slot.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, chunks: Vec<Bytes>) -> Self {
        let body = futures_util::stream::iter(chunks.into_iter().map(Ok)).boxed();
        Self::new(status, headers, body, None)
    }

    /// Status of the upstream response, until the first chunk is taken.
    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|(status, _)| *status)
    }

    fn wrap(&mut self, data: Bytes) -> StreamChunk {
        match self.head.take() {
            Some((status, headers)) => StreamChunk::head(data, status, headers),
            None => StreamChunk::data_only(data),
        }
    }
}

impl Stream for ChunkStream {
    type Item = Result<StreamChunk, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.body.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(data))) => {
                if let (Some(timeout), Some(idle)) = (this.idle_timeout, this.idle.as_mut()) {
                    idle.as_mut().reset(Instant::now() + timeout);
                }
                Poll::Ready(Some(Ok(this.wrap(data))))
            }
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.done = true;
                // Empty body: the head still has to be delivered once.
                if this.head.is_some() {
                    Poll::Ready(Some(Ok(this.wrap(Bytes::new()))))
                } else {
                    Poll::Ready(None)
                }
            }
            Poll::Pending => {
                let Some(timeout) = this.idle_timeout else {
                    return Poll::Pending;
                };
                let idle = this.idle.get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                if idle.as_mut().poll(cx).is_ready() {
                    this.done = true;
                    return Poll::Ready(Some(Err(ClientError::Timeout(timeout))));
                }
                Poll::Pending
            }
        }
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("status", &self.status())
            .field("done", &self.done)
            .finish()
    }
}
