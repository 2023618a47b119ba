//! Per-channel entry
//!
//! A channel entry holds everything that must change together under the
//! channel's serialization point: the bootstrap buffer and the set of
//! subscriber queues. Delivering a fragment updates the buffer and fans the
//! payload out in one step, so a subscriber added between two deliveries
//! observes exactly `snapshot || later fragments`.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::media::Bootstrap;

use super::frame::Fragment;

/// A live subscription: the bootstrap snapshot taken at join time plus the
/// queue of everything published after it.
#[derive(Debug)]
pub struct Subscription {
    /// Identifier for unsubscribing
    pub id: u64,
    /// Initialization prefix of the stream
    pub header: Bytes,
    /// Body snapshot, starting at the latest random-access point
    pub body: Bytes,
    /// Live fragments, closed when the publisher goes away
    pub queue: mpsc::Receiver<Bytes>,
}

/// State for a single live channel
#[derive(Debug)]
pub struct ChannelEntry {
    bootstrap: Arc<Bootstrap>,
    subscribers: HashMap<u64, mpsc::Sender<Bytes>>,
    next_subscriber_id: u64,
    queue_capacity: usize,
}

impl ChannelEntry {
    pub(super) fn new(bootstrap: Arc<Bootstrap>, queue_capacity: usize) -> Self {
        Self {
            bootstrap,
            subscribers: HashMap::new(),
            next_subscriber_id: 1,
            queue_capacity,
        }
    }

    /// Number of attached subscriber queues
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Snapshot the bootstrap and attach a fresh queue, atomically with
    /// respect to [`deliver`](Self::deliver).
    pub(super) fn subscribe(&mut self) -> Subscription {
        let (header, body) = self.bootstrap.snapshot();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.insert(id, tx);

        Subscription {
            id,
            header,
            body,
            queue: rx,
        }
    }

    /// Detach a subscriber queue. Returns whether it was present.
    pub(super) fn unsubscribe(&mut self, id: u64) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Apply the fragment to the bootstrap body, then enqueue its payload on
    /// every subscriber queue. Full queues drop the message; closed queues
    /// (subscriber gone) are pruned. Returns the number of deliveries.
    pub(super) fn deliver(&mut self, fragment: &Fragment) -> usize {
        self.bootstrap.apply(fragment.marker, &fragment.data);

        let mut delivered = 0;
        self.subscribers.retain(|id, tx| {
            match tx.try_send(fragment.data.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(
                        subscriber = *id,
                        bytes = fragment.len(),
                        "subscriber queue full, dropping message"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = *id, "subscriber gone, pruning queue");
                    false
                }
            }
        });
        delivered
    }

    /// Snapshot of the channel's bootstrap buffer
    pub(super) fn bootstrap_snapshot(&self) -> (Bytes, Bytes) {
        self.bootstrap.snapshot()
    }

    /// Close every subscriber queue, signaling end of stream.
    pub(super) fn shutdown(&mut self) {
        self.subscribers.clear();
    }
}
