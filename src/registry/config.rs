//! Registry configuration

use std::time::Duration;

/// Configuration for the channel registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Bounded capacity of each subscriber queue
    pub queue_capacity: usize,

    /// How long a publish waits for the channel's serialization point before
    /// the fragment is dropped
    pub publish_timeout: Duration,

    /// How long add/remove-subscriber operations wait before being abandoned
    pub control_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            publish_timeout: Duration::from_secs(5),
            control_timeout: Duration::from_secs(1),
        }
    }
}

impl RegistryConfig {
    /// Set the subscriber queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the publish wait bound
    pub fn publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Set the control operation wait bound
    pub fn control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }
}
