//! Registry error types

/// Error type for channel registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// The channel already has a live publisher
    PublisherExists(String),
    /// No publisher is live on the channel
    ChannelMissing(String),
    /// The channel's serialization point did not accept a control operation
    /// within the configured bound
    ControlStalled(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // These two texts are part of the HTTP surface: they are served
            // verbatim as the 400/404 response bodies.
            RegistryError::PublisherExists(_) => write!(f, "has a writer already"),
            RegistryError::ChannelMissing(channel) => {
                write!(f, "couldn't find stream {}", channel)
            }
            RegistryError::ControlStalled(channel) => {
                write!(f, "control point stalled for {}", channel)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
