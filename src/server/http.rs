//! HTTP adapter
//!
//! Maps each request under `/stream/` to a role and drives the policy hooks
//! and the channel registry:
//!
//! - POST: `on_open` builds the per-request state (and the channel's
//!   bootstrap), the adapter claims the publisher slot, then loops
//!   `get_next` → `publish` until a terminal reply. Every exit path closes
//!   the channel, which terminates its subscribers and frees the name.
//! - GET: `on_open` vets the request, the adapter joins the channel and
//!   streams the bootstrap snapshot followed by live messages until the
//!   publisher goes away or the client disconnects.
//!
//! The full request path is the channel key, so `/stream/x` is the name a
//! publisher claims and a subscriber looks up.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::{ChannelRegistry, RegistryError, Subscription};

use super::app::{OpenRequest, Opened, RelayApp, Reply, Role};
use super::body::RequestBody;
use super::config::RelayConfig;

/// The relay HTTP server
pub struct RelayServer<A> {
    config: RelayConfig,
    shared: Arc<Shared<A>>,
}

struct Shared<A> {
    app: A,
    registry: Arc<ChannelRegistry>,
}

impl<A: RelayApp> RelayServer<A> {
    /// Create a server over an app and the registry it shares with it
    pub fn new(config: RelayConfig, app: A, registry: Arc<ChannelRegistry>) -> Self {
        Self {
            config,
            shared: Arc::new(Shared { app, registry }),
        }
    }

    /// The channel registry backing this server
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.shared.registry
    }

    fn router(&self) -> Router {
        Router::new()
            .route(
                "/stream/*channel",
                post(publish::<A>).get(subscribe::<A>),
            )
            .with_state(Arc::clone(&self.shared))
    }

    /// Bind the configured address and serve until the process exits
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "webm relay listening");
        self.serve_on(listener).await
    }

    /// Serve with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "webm relay listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    /// Serve on an already-bound listener
    pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// POST: drive a publisher
async fn publish<A: RelayApp>(
    State(shared): State<Arc<Shared<A>>>,
    uri: Uri,
    request: axum::extract::Request,
) -> Response {
    let mut open = OpenRequest {
        role: Role::Publisher,
        channel: uri.path().to_string(),
        body: Some(RequestBody::new(request.into_body())),
        bootstrap: None,
    };

    let mut state = match shared.app.on_open(&mut open).await {
        Opened::Accept(state) => state,
        Opened::Reject(reply) => return reply.into_response(),
    };

    // The app owns channel naming; it may have rewritten the default.
    let channel = open.channel;

    let Some(bootstrap) = open.bootstrap.take() else {
        tracing::error!(channel = %channel, "publisher accepted without a bootstrap");
        return Reply::new(StatusCode::INTERNAL_SERVER_ERROR, "").into_response();
    };

    if let Err(e) = shared.registry.open_publisher(&channel, bootstrap).await {
        // Lost the claim race after the app's own check passed.
        let response = Reply::new(StatusCode::FORBIDDEN, e.to_string()).into_response();
        shared.app.on_close(state, Role::Publisher, &channel).await;
        return response;
    }

    let reply = loop {
        let pull = shared.app.get_next(&mut state).await;
        if let Some(fragment) = pull.fragment {
            shared.registry.publish(&channel, fragment).await;
        }
        if let Some(reply) = pull.reply {
            break reply;
        }
    };

    // Terminates every subscriber and frees the channel name.
    shared.registry.close_publisher(&channel).await;
    reply.into_response()
}

/// GET: drive a subscriber
async fn subscribe<A: RelayApp>(
    State(shared): State<Arc<Shared<A>>>,
    uri: Uri,
) -> Response {
    let mut open = OpenRequest {
        role: Role::Subscriber,
        channel: uri.path().to_string(),
        body: None,
        bootstrap: None,
    };

    let state = match shared.app.on_open(&mut open).await {
        Opened::Accept(state) => state,
        Opened::Reject(reply) => return reply.into_response(),
    };
    let channel = open.channel;

    let subscription = match shared.registry.subscribe(&channel).await {
        Ok(subscription) => subscription,
        Err(e) => {
            let status = match e {
                RegistryError::ChannelMissing(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            };
            return Reply::new(status, e.to_string()).into_response();
        }
    };

    let stream = subscriber_stream(shared, channel, state, subscription);
    (
        [(header::CONTENT_TYPE, "video/webm")],
        Body::from_stream(stream),
    )
        .into_response()
}

enum Phase {
    Header,
    Body,
    Live,
}

struct SubscriberFlow<A: RelayApp> {
    shared: Arc<Shared<A>>,
    channel: String,
    state: Option<A::State>,
    subscription: Subscription,
    phase: Phase,
    guard: DetachGuard,
}

/// Response body: bootstrap header, bootstrap body, then live messages until
/// the publisher goes away.
fn subscriber_stream<A: RelayApp>(
    shared: Arc<Shared<A>>,
    channel: String,
    state: A::State,
    subscription: Subscription,
) -> impl Stream<Item = io::Result<Bytes>> {
    let guard = DetachGuard {
        registry: Arc::clone(&shared.registry),
        channel: channel.clone(),
        subscriber: subscription.id,
        armed: true,
    };
    let flow = SubscriberFlow {
        shared,
        channel,
        state: Some(state),
        subscription,
        phase: Phase::Header,
        guard,
    };

    stream::unfold(flow, |mut flow| async move {
        match flow.phase {
            Phase::Header => {
                flow.phase = Phase::Body;
                let header = flow.subscription.header.clone();
                Some((Ok(header), flow))
            }
            Phase::Body => {
                flow.phase = Phase::Live;
                let body = flow.subscription.body.clone();
                Some((Ok(body), flow))
            }
            Phase::Live => match flow.subscription.queue.recv().await {
                Some(bytes) => Some((Ok(bytes), flow)),
                None => {
                    // End of stream: the publisher closed the channel.
                    flow.guard.disarm();
                    if let Some(state) = flow.state.take() {
                        flow.shared
                            .app
                            .on_close(state, Role::Subscriber, &flow.channel)
                            .await;
                    }
                    None
                }
            },
        }
    })
}

/// Detaches the subscriber if the response stream is dropped mid-flight
/// (client disconnect). The dead queue would be pruned on the next publish
/// anyway; this just frees it promptly.
struct DetachGuard {
    registry: Arc<ChannelRegistry>,
    channel: String,
    subscriber: u64,
    armed: bool,
}

impl DetachGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::debug!(
            channel = %self.channel,
            subscriber = self.subscriber,
            "subscriber dropped mid-stream, detaching"
        );
        let registry = Arc::clone(&self.registry);
        let channel = std::mem::take(&mut self.channel);
        let subscriber = self.subscriber;
        tokio::spawn(async move {
            registry.unsubscribe(&channel, subscriber).await;
        });
    }
}
