//! Fragment type for channel fan-out
//!
//! A fragment is one serialized EBML element plus the effect it has on the
//! channel's bootstrap body. Payloads are `Bytes`, so fanning a fragment out
//! to many subscribers is reference counting, not copying.

use bytes::Bytes;

use crate::media::Marker;

/// One publishable piece of the stream
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Exact wire bytes of the element
    pub data: Bytes,
    /// Effect on the bootstrap body
    pub marker: Marker,
}

impl Fragment {
    pub fn new(data: Bytes, marker: Marker) -> Self {
        Self { data, marker }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
