//! Channel registry implementation
//!
//! The process-wide map of live channels. A channel exists exactly while a
//! publisher holds it; closing the publisher removes the channel and closes
//! every subscriber queue, making the name available again.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

use crate::media::Bootstrap;

use super::config::RegistryConfig;
use super::entry::{ChannelEntry, Subscription};
use super::error::RegistryError;
use super::frame::Fragment;

/// Central registry for all live channels
///
/// The outer map is read-mostly; each channel entry sits behind its own
/// mutex, which is the channel's serialization point: publish, subscribe,
/// unsubscribe, and close all pass through it. Neither lock is ever held
/// across I/O.
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, Arc<Mutex<ChannelEntry>>>>,
    config: RegistryConfig,
}

impl ChannelRegistry {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Claim a channel for a publisher.
    ///
    /// The bootstrap handle becomes the channel's catch-up source; every
    /// published fragment is applied to it before fan-out.
    pub async fn open_publisher(
        &self,
        channel: &str,
        bootstrap: Arc<Bootstrap>,
    ) -> Result<(), RegistryError> {
        let mut channels = self.channels.write().await;

        if channels.contains_key(channel) {
            return Err(RegistryError::PublisherExists(channel.to_string()));
        }

        channels.insert(
            channel.to_string(),
            Arc::new(Mutex::new(ChannelEntry::new(
                bootstrap,
                self.config.queue_capacity,
            ))),
        );

        tracing::info!(channel = %channel, "publisher opened");
        Ok(())
    }

    /// Remove the channel and close every subscriber queue.
    ///
    /// Safe to call for a channel that is already gone.
    pub async fn close_publisher(&self, channel: &str) {
        let entry = self.channels.write().await.remove(channel);

        if let Some(entry) = entry {
            let mut entry = entry.lock().await;
            let subscribers = entry.subscriber_count();
            entry.shutdown();

            tracing::info!(
                channel = %channel,
                subscribers = subscribers,
                "publisher closed, channel removed"
            );
        }
    }

    /// Whether the channel has a live publisher
    pub async fn has_publisher(&self, channel: &str) -> bool {
        self.channels.read().await.contains_key(channel)
    }

    /// Number of live channels
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Join a channel: snapshot its bootstrap and attach a queue, atomically
    /// with respect to publishing, so the subscriber's byte stream has no
    /// gap and no duplicate around the join point.
    pub async fn subscribe(&self, channel: &str) -> Result<Subscription, RegistryError> {
        let entry = self
            .lookup(channel)
            .await
            .ok_or_else(|| RegistryError::ChannelMissing(channel.to_string()))?;

        let result = match timeout(self.config.control_timeout, entry.lock()).await {
            Ok(mut entry) => {
                let subscription = entry.subscribe();
                tracing::info!(
                    channel = %channel,
                    subscribers = entry.subscriber_count(),
                    "subscriber added"
                );
                Ok(subscription)
            }
            Err(_) => {
                tracing::warn!(channel = %channel, "timed out adding subscriber, abandoning");
                Err(RegistryError::ControlStalled(channel.to_string()))
            }
        };
        result
    }

    /// Detach a subscriber queue.
    ///
    /// Best-effort: on timeout the operation is logged and abandoned, and the
    /// dead queue is pruned on the next publish instead.
    pub async fn unsubscribe(&self, channel: &str, id: u64) {
        let Some(entry) = self.lookup(channel).await else {
            return;
        };

        match timeout(self.config.control_timeout, entry.lock()).await {
            Ok(mut entry) => {
                entry.unsubscribe(id);
                tracing::debug!(
                    channel = %channel,
                    subscribers = entry.subscriber_count(),
                    "subscriber removed"
                );
            }
            Err(_) => {
                tracing::warn!(channel = %channel, "timed out removing subscriber, abandoning");
            }
        };
    }

    /// Publish a fragment: apply it to the bootstrap body, then enqueue the
    /// payload on every subscriber queue (non-blocking, drop on full).
    ///
    /// Waits a bounded time for the channel's serialization point; on timeout
    /// the fragment is dropped. Publishing to a channel that no longer exists
    /// is a no-op.
    pub async fn publish(&self, channel: &str, fragment: Fragment) {
        let Some(entry) = self.lookup(channel).await else {
            return;
        };

        match timeout(self.config.publish_timeout, entry.lock()).await {
            Ok(mut entry) => {
                entry.deliver(&fragment);
            }
            Err(_) => {
                tracing::warn!(
                    channel = %channel,
                    bytes = fragment.len(),
                    "timed out publishing, dropping fragment"
                );
            }
        };
    }

    /// Current bootstrap snapshot for a channel
    pub async fn snapshot(&self, channel: &str) -> Option<(Bytes, Bytes)> {
        let entry = self.lookup(channel).await?;
        let entry = timeout(self.config.control_timeout, entry.lock())
            .await
            .ok()?;
        // The entry lock already serializes against publishes; the snapshot
        // is taken through the shared bootstrap handle.
        Some(entry.bootstrap_snapshot())
    }

    async fn lookup(&self, channel: &str) -> Option<Arc<Mutex<ChannelEntry>>> {
        self.channels.read().await.get(channel).cloned()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Marker;
    use std::time::Duration;

    fn bootstrap() -> Arc<Bootstrap> {
        Arc::new(Bootstrap::new(
            Bytes::from_static(b"HDR"),
            Bytes::from_static(b"C1"),
        ))
    }

    fn frag(data: &'static [u8]) -> Fragment {
        Fragment::new(Bytes::from_static(data), Marker::None)
    }

    #[tokio::test]
    async fn test_single_publisher() {
        let registry = ChannelRegistry::new();

        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();
        assert!(registry.has_publisher("/stream/x").await);

        let second = registry.open_publisher("/stream/x", bootstrap()).await;
        assert!(matches!(second, Err(RegistryError::PublisherExists(_))));
    }

    #[tokio::test]
    async fn test_channel_released_after_close() {
        let registry = ChannelRegistry::new();

        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();
        registry.close_publisher("/stream/x").await;
        assert!(!registry.has_publisher("/stream/x").await);
        assert_eq!(registry.channel_count().await, 0);

        // The name is available again.
        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_missing_channel() {
        let registry = ChannelRegistry::new();
        let result = registry.subscribe("/stream/missing").await;
        assert!(matches!(result, Err(RegistryError::ChannelMissing(_))));
    }

    #[tokio::test]
    async fn test_delivery_in_publish_order() {
        let registry = ChannelRegistry::new();
        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();

        let mut sub = registry.subscribe("/stream/x").await.unwrap();
        assert_eq!(&sub.header[..], b"HDR");
        assert_eq!(&sub.body[..], b"C1");

        registry.publish("/stream/x", frag(b"b1")).await;
        registry.publish("/stream/x", frag(b"b2")).await;
        registry.publish("/stream/x", frag(b"b3")).await;

        assert_eq!(&sub.queue.recv().await.unwrap()[..], b"b1");
        assert_eq!(&sub.queue.recv().await.unwrap()[..], b"b2");
        assert_eq!(&sub.queue.recv().await.unwrap()[..], b"b3");
    }

    #[tokio::test]
    async fn test_publish_keeps_bootstrap_current() {
        let registry = ChannelRegistry::new();
        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();

        registry.publish("/stream/x", frag(b"b1")).await;
        registry
            .publish(
                "/stream/x",
                Fragment::new(Bytes::from_static(b"C2"), Marker::ClusterStart),
            )
            .await;
        registry
            .publish(
                "/stream/x",
                Fragment::new(Bytes::from_static(b"k"), Marker::RandomAccess),
            )
            .await;

        let (_, body) = registry.snapshot("/stream/x").await.unwrap();
        assert_eq!(&body[..], b"C2k");

        // A late joiner sees the advanced body.
        let sub = registry.subscribe("/stream/x").await.unwrap();
        assert_eq!(&sub.body[..], b"C2k");
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_alone() {
        let config = RegistryConfig::default().queue_capacity(3);
        let registry = ChannelRegistry::with_config(config);
        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();

        let mut fast = registry.subscribe("/stream/x").await.unwrap();
        let mut slow = registry.subscribe("/stream/x").await.unwrap();

        // The fast subscriber drains between publishes; the slow one never
        // reads, so its queue fills at 3 and further messages are dropped.
        for _ in 0..6 {
            registry.publish("/stream/x", frag(b"x")).await;
            assert!(fast.queue.recv().await.is_some());
        }

        let mut slow_got = 0;
        while slow.queue.try_recv().is_ok() {
            slow_got += 1;
        }
        assert_eq!(slow_got, 3);

        // The publisher never stalled and the slow queue is still attached.
        registry.publish("/stream/x", frag(b"y")).await;
        assert!(fast.queue.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_close_signals_end_of_stream() {
        let registry = ChannelRegistry::new();
        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();

        let mut sub = registry.subscribe("/stream/x").await.unwrap();
        registry.publish("/stream/x", frag(b"b1")).await;
        registry.close_publisher("/stream/x").await;

        assert_eq!(&sub.queue.recv().await.unwrap()[..], b"b1");
        assert!(sub.queue.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_pruned_on_publish() {
        let registry = ChannelRegistry::new();
        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();

        let sub = registry.subscribe("/stream/x").await.unwrap();
        drop(sub);

        registry.publish("/stream/x", frag(b"b1")).await;

        let entry = registry.lookup("/stream/x").await.unwrap();
        assert_eq!(entry.lock().await.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_to_missing_channel_is_noop() {
        let registry = ChannelRegistry::new();
        registry.publish("/stream/none", frag(b"b1")).await;
        assert_eq!(registry.channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_detaches_queue() {
        let registry = ChannelRegistry::with_config(
            RegistryConfig::default().control_timeout(Duration::from_millis(100)),
        );
        registry
            .open_publisher("/stream/x", bootstrap())
            .await
            .unwrap();

        let sub = registry.subscribe("/stream/x").await.unwrap();
        registry.unsubscribe("/stream/x", sub.id).await;

        let entry = registry.lookup("/stream/x").await.unwrap();
        assert_eq!(entry.lock().await.subscriber_count(), 0);
    }
}
