//! The WebM relay policy
//!
//! Wires the generic HTTP adapter to WebM semantics: a POST body is parsed
//! by a [`Keeper`] whose bootstrap becomes the channel's catch-up source; a
//! GET is vetted against the registry before the adapter joins it to the
//! channel.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use tokio::io::BufReader;

use crate::error::Error;
use crate::keeper::Keeper;
use crate::registry::{ChannelRegistry, RegistryError};
use crate::server::{OpenRequest, Opened, Pull, RelayApp, Reply, RequestBody, Role};

/// Default capacity of the buffered reader over a publisher's body
const DEFAULT_READ_BUFFER: usize = 64 * 1024;

/// Relay policy: one WebM publisher per channel, any number of subscribers
pub struct WebmRelay {
    registry: Arc<ChannelRegistry>,
    read_buffer_size: usize,
}

/// Per-request state
pub struct RelayState {
    channel: String,
    /// Present for publishers only
    keeper: Option<Keeper<BufReader<RequestBody>>>,
}

impl WebmRelay {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self {
            registry,
            read_buffer_size: DEFAULT_READ_BUFFER,
        }
    }

    /// Set the buffered-reader capacity used for publisher bodies
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1024);
        self
    }
}

#[async_trait]
impl RelayApp for WebmRelay {
    type State = RelayState;

    async fn on_open(&self, request: &mut OpenRequest) -> Opened<RelayState> {
        tracing::info!(channel = %request.channel, role = ?request.role, "request opened");

        match request.role {
            Role::Publisher => {
                let Some(body) = request.body.take() else {
                    return Opened::Reject(Reply::new(
                        StatusCode::BAD_REQUEST,
                        "missing request body",
                    ));
                };

                let reader = BufReader::with_capacity(self.read_buffer_size, body);
                let keeper = match Keeper::new(reader).await {
                    Ok(keeper) => keeper,
                    Err(e) => {
                        tracing::warn!(
                            channel = %request.channel,
                            error = %e,
                            "could not read stream header"
                        );
                        return Opened::Reject(Reply::new(StatusCode::BAD_REQUEST, e.to_string()));
                    }
                };

                if self.registry.has_publisher(&request.channel).await {
                    let e = RegistryError::PublisherExists(request.channel.clone());
                    return Opened::Reject(Reply::new(StatusCode::BAD_REQUEST, e.to_string()));
                }

                request.bootstrap = Some(keeper.bootstrap());
                Opened::Accept(RelayState {
                    channel: request.channel.clone(),
                    keeper: Some(keeper),
                })
            }

            Role::Subscriber => {
                if !self.registry.has_publisher(&request.channel).await {
                    let e = RegistryError::ChannelMissing(request.channel.clone());
                    return Opened::Reject(Reply::new(StatusCode::NOT_FOUND, e.to_string()));
                }
                Opened::Accept(RelayState {
                    channel: request.channel.clone(),
                    keeper: None,
                })
            }
        }
    }

    async fn get_next(&self, state: &mut RelayState) -> Pull {
        let Some(keeper) = state.keeper.as_mut() else {
            // get_next is only driven for publishers
            return Pull::finish(Reply::new(StatusCode::INTERNAL_SERVER_ERROR, ""));
        };

        match keeper.next().await {
            Ok(fragment) => Pull::fragment(fragment),
            Err(Error::StreamEnded) => Pull::finish(Reply::ok()),
            Err(Error::Io(e)) => {
                tracing::warn!(channel = %state.channel, error = %e, "publisher connection lost");
                Pull::finish(Reply::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Error::ClientGone.to_string(),
                ))
            }
            Err(e) => {
                tracing::warn!(channel = %state.channel, error = %e, "error reading stream");
                Pull::finish(Reply::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
            }
        }
    }

    async fn on_close(&self, _state: RelayState, role: Role, channel: &str) {
        tracing::info!(channel = %channel, role = ?role, "request closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use bytes::Bytes;
    use crate::media::Bootstrap;

    fn leaf(id: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.push(0x80 | payload.len() as u8);
        out.extend_from_slice(payload);
        out
    }

    fn sized_master(id: &[u8], children: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.push(0x80 | children.len() as u8);
        out.extend_from_slice(children);
        out
    }

    fn webm_doc() -> Vec<u8> {
        let mut doc = sized_master(&[0x1A, 0x45, 0xDF, 0xA3], &leaf(&[0x42, 0x82], b"webm"));
        doc.extend([0x18, 0x53, 0x80, 0x67, 0xFF]); // Segment, unknown size
        doc.extend([0x1F, 0x43, 0xB6, 0x75, 0xFF]); // Cluster, unknown size
        doc.extend(leaf(&[0xA3], &[0x81, 0x00, 0x00, 0x80, 0xAA]));
        doc.extend(leaf(&[0xA3], &[0x82, 0x00, 0x00, 0x80, 0xAA]));
        doc
    }

    fn open_request(role: Role, channel: &str, body: Option<Vec<u8>>) -> OpenRequest {
        OpenRequest {
            role,
            channel: channel.to_string(),
            body: body.map(|b| RequestBody::new(Body::from(b))),
            bootstrap: None,
        }
    }

    #[tokio::test]
    async fn test_publisher_open_provides_bootstrap() {
        let registry = Arc::new(ChannelRegistry::new());
        let app = WebmRelay::new(Arc::clone(&registry));

        let mut request = open_request(Role::Publisher, "/stream/x", Some(webm_doc()));
        let opened = app.on_open(&mut request).await;

        assert!(matches!(opened, Opened::Accept(_)));
        assert!(request.bootstrap.is_some());
    }

    #[tokio::test]
    async fn test_publisher_rejected_on_garbage() {
        let registry = Arc::new(ChannelRegistry::new());
        let app = WebmRelay::new(registry);

        let mut request =
            open_request(Role::Publisher, "/stream/x", Some(vec![0x00, 0x01, 0x02]));
        match app.on_open(&mut request).await {
            Opened::Reject(reply) => assert_eq!(reply.status, StatusCode::BAD_REQUEST),
            Opened::Accept(_) => panic!("garbage header accepted"),
        }
    }

    #[tokio::test]
    async fn test_second_publisher_rejected() {
        let registry = Arc::new(ChannelRegistry::new());
        let app = WebmRelay::new(Arc::clone(&registry));

        let bootstrap = Arc::new(Bootstrap::new(
            Bytes::from_static(b"HDR"),
            Bytes::from_static(b"C1"),
        ));
        registry
            .open_publisher("/stream/x", bootstrap)
            .await
            .unwrap();

        let mut request = open_request(Role::Publisher, "/stream/x", Some(webm_doc()));
        match app.on_open(&mut request).await {
            Opened::Reject(reply) => {
                assert_eq!(reply.status, StatusCode::BAD_REQUEST);
                assert_eq!(reply.body, "has a writer already");
            }
            Opened::Accept(_) => panic!("second publisher accepted"),
        }
    }

    #[tokio::test]
    async fn test_subscriber_missing_channel() {
        let registry = Arc::new(ChannelRegistry::new());
        let app = WebmRelay::new(registry);

        let mut request = open_request(Role::Subscriber, "/stream/missing", None);
        match app.on_open(&mut request).await {
            Opened::Reject(reply) => {
                assert_eq!(reply.status, StatusCode::NOT_FOUND);
                assert_eq!(reply.body, "couldn't find stream /stream/missing");
            }
            Opened::Accept(_) => panic!("missing channel accepted"),
        }
    }

    #[tokio::test]
    async fn test_get_next_until_clean_eof() {
        let registry = Arc::new(ChannelRegistry::new());
        let app = WebmRelay::new(Arc::clone(&registry));

        let mut request = open_request(Role::Publisher, "/stream/x", Some(webm_doc()));
        let Opened::Accept(mut state) = app.on_open(&mut request).await else {
            panic!("publisher rejected");
        };

        // Two SimpleBlocks remain past the first cluster header.
        let pull = app.get_next(&mut state).await;
        assert!(pull.fragment.is_some());
        let pull = app.get_next(&mut state).await;
        assert!(pull.fragment.is_some());

        let pull = app.get_next(&mut state).await;
        let reply = pull.reply.expect("terminal reply");
        assert_eq!(reply.status, StatusCode::OK);
    }
}
