//! Request body as an async byte source
//!
//! The keeper wants an `AsyncRead`; axum hands us the request body as a
//! stream of `Bytes` chunks. This adapter bridges the two. A transport error
//! while the publisher is mid-stream surfaces as a broken-pipe I/O error,
//! which the policy layer reports as the client going away.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, BodyDataStream};
use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncRead, ReadBuf};

/// `AsyncRead` over a streaming HTTP request body
pub struct RequestBody {
    stream: BodyDataStream,
    /// Unread remainder of the current chunk
    chunk: Bytes,
}

impl RequestBody {
    pub fn new(body: Body) -> Self {
        Self {
            stream: body.into_data_stream(),
            chunk: Bytes::new(),
        }
    }
}

impl AsyncRead for RequestBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.chunk.is_empty() {
                let n = this.chunk.len().min(buf.remaining());
                buf.put_slice(&this.chunk.split_to(n));
                return Poll::Ready(Ok(()));
            }

            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.chunk = chunk,
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, e)))
                }
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBody")
            .field("buffered", &self.chunk.len())
            .finish()
    }
}
