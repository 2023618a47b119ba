//! Relay policy interface
//!
//! The HTTP adapter is generic over a [`RelayApp`]: policy (who may publish,
//! how frames are produced, what the error bodies say) lives in the app,
//! while transport (routing, fan-out, response streaming) lives in the
//! adapter. Three hooks drive a request:
//!
//! - `on_open` runs once per request and either accepts it with a piece of
//!   per-request state or rejects it with a status and body;
//! - `get_next` feeds a publisher loop: each call yields an optional
//!   fragment to publish and/or a terminal reply that ends the request —
//!   both at once is valid, the fragment is published before the reply is
//!   sent;
//! - `on_close` runs at the very end of a request that was not cut short by
//!   an earlier reply.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::media::Bootstrap;
use crate::registry::Fragment;

use super::body::RequestBody;

/// What a request is here to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// POST: the request body is the live stream
    Publisher,
    /// GET: the response body becomes a live stream
    Subscriber,
}

/// A short-circuit or terminal response
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 with an empty body
    pub fn ok() -> Self {
        Self::new(StatusCode::OK, "")
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

/// Everything `on_open` may inspect or take from a fresh request
pub struct OpenRequest {
    pub role: Role,
    /// Channel name: the full request path
    pub channel: String,
    /// Request body; present for publishers, who take it to read the stream
    pub body: Option<RequestBody>,
    /// Set by a publisher's `on_open`: the catch-up source the adapter
    /// registers with the channel
    pub bootstrap: Option<Arc<Bootstrap>>,
}

/// Outcome of `on_open`
pub enum Opened<S> {
    /// Continue the request with this per-request state
    Accept(S),
    /// Respond immediately and stop
    Reject(Reply),
}

/// Outcome of one `get_next` call
pub struct Pull {
    /// Fragment to publish, if any
    pub fragment: Option<Fragment>,
    /// Terminal reply; ends the publisher request after any fragment above
    /// has been published
    pub reply: Option<Reply>,
}

impl Pull {
    pub fn fragment(fragment: Fragment) -> Self {
        Self {
            fragment: Some(fragment),
            reply: None,
        }
    }

    pub fn finish(reply: Reply) -> Self {
        Self {
            fragment: None,
            reply: Some(reply),
        }
    }
}

/// Policy hooks driving relay requests
#[async_trait]
pub trait RelayApp: Send + Sync + 'static {
    /// Per-request state, created by `on_open` and owned by the adapter for
    /// the rest of the request
    type State: Send + 'static;

    async fn on_open(&self, request: &mut OpenRequest) -> Opened<Self::State>;

    async fn get_next(&self, state: &mut Self::State) -> Pull;

    async fn on_close(&self, state: Self::State, role: Role, channel: &str);
}
