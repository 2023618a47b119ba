//! EBML element
//!
//! An element as it appeared on the wire: id, name, nesting level, and the
//! exact bytes that encoded it. Master elements carry only their header (id
//! and size field); their children follow as separate elements. Concatenating
//! `wire bytes` of every element in document order reproduces the input
//! stream byte for byte.

use bytes::{Bytes, BytesMut};

use super::schema;

/// One parsed EBML element
#[derive(Debug, Clone)]
pub struct Element {
    /// Element id with the marker bit included
    pub id: u32,
    /// Nesting depth (0 for top-level elements such as `EBML` and `Segment`)
    pub level: usize,
    /// Raw id + size bytes as read from the stream
    header: Bytes,
    /// Payload bytes; empty for master elements
    payload: Bytes,
}

impl Element {
    pub(super) fn new(id: u32, level: usize, header: Bytes, payload: Bytes) -> Self {
        Self {
            id,
            level,
            header,
            payload,
        }
    }

    /// Schema name of this element, `"Unknown"` if not in the table
    pub fn name(&self) -> &'static str {
        schema::name(self.id)
    }

    /// Payload bytes (empty for master elements)
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Total wire size: header plus payload
    pub fn wire_len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    /// Exact byte representation as it appeared on the wire
    pub fn to_bytes(&self) -> Bytes {
        if self.payload.is_empty() {
            return self.header.clone();
        }
        let mut buf = BytesMut::with_capacity(self.wire_len());
        buf.extend_from_slice(&self.header);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Append the wire bytes to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(&self.header);
        buf.extend_from_slice(&self.payload);
    }
}
