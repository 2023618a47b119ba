//! Bootstrap buffer for mid-stream joiners
//!
//! A viewer joining a live WebM stream needs:
//! 1. The initialization prefix (everything before the first Cluster)
//! 2. A decodable suffix starting at a random-access point: a Cluster whose
//!    first block on each track is a keyframe
//!
//! The buffer holds both: an immutable `header` captured at stream start and
//! a rolling `body` anchored at the most recent confirmed random-access
//! point. Concatenating `header || body` always forms a playable stream.
//!
//! The keeper decides what each appended fragment means for the body (see
//! [`Marker`]); the buffer just applies it. Both `apply` and `snapshot` are
//! called under the owning channel's serialization point, which is what
//! keeps a joiner's snapshot consistent with the live messages that follow.

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

/// How a fragment affects the rolling body buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Append only
    None,
    /// A new Cluster begins with this fragment; remember where, so the body
    /// can later be cut down to it
    ClusterStart,
    /// This fragment confirms the anchored Cluster as a random-access point;
    /// drop everything before the anchor, then append
    RandomAccess,
}

#[derive(Debug)]
struct Body {
    buf: BytesMut,
    /// Offset of the most recent Cluster header within `buf`
    last_cluster: usize,
}

/// Header plus rolling body for one channel
#[derive(Debug)]
pub struct Bootstrap {
    header: Bytes,
    body: Mutex<Body>,
}

impl Bootstrap {
    /// Create a bootstrap whose body starts with the first Cluster's header
    /// bytes.
    pub fn new(header: Bytes, first_cluster: Bytes) -> Self {
        let mut buf = BytesMut::with_capacity(4096);
        buf.extend_from_slice(&first_cluster);
        Self {
            header,
            body: Mutex::new(Body {
                buf,
                last_cluster: 0,
            }),
        }
    }

    /// The immutable initialization prefix
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    /// Apply one fragment: honor its marker, then append its bytes.
    pub fn apply(&self, marker: Marker, data: &[u8]) {
        let mut body = self.body.lock();
        match marker {
            Marker::None => {}
            Marker::ClusterStart => {
                body.last_cluster = body.buf.len();
            }
            Marker::RandomAccess => {
                let at = body.last_cluster;
                let tail = body.buf.split_off(at);
                body.buf = tail;
                body.last_cluster = 0;
            }
        }
        body.buf.extend_from_slice(data);
    }

    /// Copies of the header and the current body
    pub fn snapshot(&self) -> (Bytes, Bytes) {
        let body = self.body.lock();
        (self.header.clone(), Bytes::copy_from_slice(&body.buf))
    }

    /// Current body length in bytes
    pub fn body_len(&self) -> usize {
        self.body.lock().buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap() -> Bootstrap {
        Bootstrap::new(Bytes::from_static(b"HDR"), Bytes::from_static(b"C1"))
    }

    #[test]
    fn test_initial_snapshot() {
        let b = bootstrap();
        let (header, body) = b.snapshot();
        assert_eq!(&header[..], b"HDR");
        assert_eq!(&body[..], b"C1");
    }

    #[test]
    fn test_append_grows_body() {
        let b = bootstrap();
        b.apply(Marker::None, b"b1");
        b.apply(Marker::None, b"b2");
        assert_eq!(&b.snapshot().1[..], b"C1b1b2");
    }

    #[test]
    fn test_random_access_rewinds_to_anchor() {
        let b = bootstrap();
        b.apply(Marker::None, b"b1");
        b.apply(Marker::ClusterStart, b"C2");
        b.apply(Marker::None, b"b2");
        // The confirming fragment drops everything before the second cluster.
        b.apply(Marker::RandomAccess, b"b3");
        assert_eq!(&b.snapshot().1[..], b"C2b2b3");

        // Body keeps growing from the new anchor.
        b.apply(Marker::None, b"b4");
        assert_eq!(&b.snapshot().1[..], b"C2b2b3b4");
    }

    #[test]
    fn test_rewind_shrinks_body() {
        let b = bootstrap();
        for _ in 0..10 {
            b.apply(Marker::None, b"xxxxxxxx");
        }
        let before = b.body_len();
        b.apply(Marker::ClusterStart, b"C2");
        b.apply(Marker::RandomAccess, b"k");
        assert!(b.body_len() < before);
        assert_eq!(&b.snapshot().1[..], b"C2k");
    }

    #[test]
    fn test_header_untouched_by_applies() {
        let b = bootstrap();
        b.apply(Marker::ClusterStart, b"C2");
        b.apply(Marker::RandomAccess, b"k");
        assert_eq!(&b.snapshot().0[..], b"HDR");
    }
}
