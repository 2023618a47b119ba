//! Incremental EBML tokenizer
//!
//! Reads elements one at a time from an async byte source, in document
//! order. Master elements are yielded as soon as their header is read;
//! their children follow as separate elements at the next nesting level.
//!
//! Two closure rules end a master element:
//! - a known size: the master ends when the stream offset reaches the end of
//!   its declared payload;
//! - an unknown size (live `Segment` and `Cluster` streams): the master ends
//!   when an element arrives whose schema parent sits at or above it, e.g. a
//!   new `Cluster` closes the previous one.
//!
//! The tokenizer never re-encodes anything; every element keeps the exact
//! bytes that carried it, so the stream can be relayed byte for byte.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

use super::element::Element;
use super::schema::{self, Kind, Parent};
use super::varint;

/// Upper bound on a leaf payload. A corrupt size field would otherwise ask
/// for an arbitrarily large allocation.
const MAX_LEAF_SIZE: u64 = 64 * 1024 * 1024;

/// Element ids are at most four bytes in Matroska
const MAX_ID_WIDTH: usize = 4;

/// An open master element on the parse stack
#[derive(Debug)]
struct OpenMaster {
    id: u32,
    /// Absolute offset where the element ends; `None` for unknown size
    end: Option<u64>,
}

/// Incremental EBML tokenizer over an async byte source
#[derive(Debug)]
pub struct Tokenizer<R> {
    reader: R,
    /// Bytes consumed from the stream so far
    offset: u64,
    /// Currently open master elements, outermost first
    stack: Vec<OpenMaster>,
}

impl<R: AsyncRead + Unpin> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            stack: Vec::new(),
        }
    }

    /// Read the next element in document order.
    ///
    /// Returns [`Error::StreamEnded`] when the source is exhausted at an
    /// element boundary and [`Error::MalformedStream`] when it ends anywhere
    /// else or an element cannot be decoded.
    pub async fn next(&mut self) -> Result<Element> {
        self.close_sized_masters()?;

        let mut header = BytesMut::with_capacity(12);

        // First byte of the id. EOF here is a clean end of stream.
        let mut byte = [0u8; 1];
        if self.reader.read(&mut byte).await? == 0 {
            return Err(Error::StreamEnded);
        }
        header.extend_from_slice(&byte);

        let id_width = varint::width(byte[0])
            .filter(|w| *w <= MAX_ID_WIDTH)
            .ok_or_else(|| Error::malformed("invalid element id"))?;
        let mut id = byte[0] as u32;
        for _ in 1..id_width {
            let b = self.read_header_byte(&mut header).await?;
            id = id << 8 | b as u32;
        }

        // Size field, marker stripped.
        let first = self.read_header_byte(&mut header).await?;
        let size_width =
            varint::width(first).ok_or_else(|| Error::malformed("invalid element size"))?;
        let mut size = (first & varint::value_mask(size_width)) as u64;
        for _ in 1..size_width {
            let b = self.read_header_byte(&mut header).await?;
            size = size << 8 | b as u64;
        }
        let unknown_size = varint::is_unknown_size(size, size_width);

        self.offset += header.len() as u64;
        let level = self.resolve_level(id);

        let def = schema::lookup(id);
        if matches!(def, Some(d) if d.kind == Kind::Master) {
            let end = if unknown_size {
                None
            } else {
                let end = self.offset + size;
                self.check_fits(end)?;
                Some(end)
            };
            self.stack.push(OpenMaster { id, end });
            return Ok(Element::new(id, level, header.freeze(), Bytes::new()));
        }

        // Leaf: the payload must be present and bounded.
        if unknown_size {
            return Err(Error::malformed("unknown size on a non-master element"));
        }
        if size > MAX_LEAF_SIZE {
            return Err(Error::malformed(format!(
                "element payload of {} bytes exceeds the {} byte limit",
                size, MAX_LEAF_SIZE
            )));
        }
        self.check_fits(self.offset + size)?;

        let mut payload = vec![0u8; size as usize];
        self.reader
            .read_exact(&mut payload)
            .await
            .map_err(map_body_eof)?;
        self.offset += size;

        Ok(Element::new(id, level, header.freeze(), payload.into()))
    }

    /// Pop known-size masters whose payload is fully consumed.
    fn close_sized_masters(&mut self) -> Result<()> {
        while let Some(top) = self.stack.last() {
            match top.end {
                Some(end) if self.offset == end => {
                    self.stack.pop();
                }
                Some(end) if self.offset > end => {
                    return Err(Error::malformed("element overran its parent boundary"));
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Close unknown-size masters that cannot contain the new element, then
    /// return its nesting level.
    fn resolve_level(&mut self, id: u32) -> usize {
        match schema::lookup(id).map(|d| d.parent) {
            Some(Parent::Root) => {
                while matches!(self.stack.last(), Some(m) if m.end.is_none()) {
                    self.stack.pop();
                }
            }
            Some(Parent::Master(parent)) => {
                if self.stack.iter().any(|m| m.id == parent) {
                    while let Some(top) = self.stack.last() {
                        if top.id == parent || top.end.is_some() {
                            break;
                        }
                        self.stack.pop();
                    }
                }
            }
            // Global elements and unknown ids nest wherever they appear.
            Some(Parent::Global) | None => {}
        }
        self.stack.len()
    }

    /// Verify that an element ending at `end` stays inside the nearest
    /// known-size ancestor.
    fn check_fits(&self, end: u64) -> Result<()> {
        if let Some(limit) = self.stack.iter().rev().find_map(|m| m.end) {
            if end > limit {
                return Err(Error::malformed("element overruns its parent"));
            }
        }
        Ok(())
    }

    async fn read_header_byte(&mut self, header: &mut BytesMut) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.reader
            .read_exact(&mut byte)
            .await
            .map_err(map_header_eof)?;
        header.extend_from_slice(&byte);
        Ok(byte[0])
    }
}

fn map_header_eof(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::malformed("stream ended inside an element header")
    } else {
        Error::Io(e)
    }
}

fn map_body_eof(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::malformed("stream ended inside an element payload")
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &[u8], payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() < 127);
        let mut out = id.to_vec();
        out.push(0x80 | payload.len() as u8);
        out.extend_from_slice(payload);
        out
    }

    fn sized_master(id: &[u8], children: &[u8]) -> Vec<u8> {
        assert!(children.len() < 127);
        let mut out = id.to_vec();
        out.push(0x80 | children.len() as u8);
        out.extend_from_slice(children);
        out
    }

    fn open_master(id: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.push(0xFF); // unknown size
        out
    }

    fn ebml_header() -> Vec<u8> {
        sized_master(&[0x1A, 0x45, 0xDF, 0xA3], &leaf(&[0x42, 0x82], b"webm"))
    }

    fn simple_block(track: u8, keyframe: bool) -> Vec<u8> {
        let flags = if keyframe { 0x80 } else { 0x00 };
        leaf(&[0xA3], &[0x80 | track, 0x00, 0x00, flags, 0xAA])
    }

    async fn collect(doc: &[u8]) -> Vec<(String, usize)> {
        let mut tok = Tokenizer::new(doc);
        let mut seen = Vec::new();
        loop {
            match tok.next().await {
                Ok(el) => seen.push((el.name().to_string(), el.level)),
                Err(Error::StreamEnded) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_document_order_and_levels() {
        let mut doc = ebml_header();
        doc.extend(open_master(&[0x18, 0x53, 0x80, 0x67])); // Segment
        doc.extend(sized_master(
            &[0x16, 0x54, 0xAE, 0x6B], // Tracks
            &sized_master(&[0xAE], &leaf(&[0xD7], &[0x01])),
        ));
        doc.extend(open_master(&[0x1F, 0x43, 0xB6, 0x75])); // Cluster
        doc.extend(leaf(&[0xE7], &[0x00]));
        doc.extend(simple_block(1, true));

        let seen = collect(&doc).await;
        assert_eq!(
            seen,
            vec![
                ("EBML".to_string(), 0),
                ("DocType".to_string(), 1),
                ("Segment".to_string(), 0),
                ("Tracks".to_string(), 1),
                ("TrackEntry".to_string(), 2),
                ("TrackNumber".to_string(), 3),
                ("Cluster".to_string(), 1),
                ("Timecode".to_string(), 2),
                ("SimpleBlock".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_new_cluster_closes_open_cluster() {
        let mut doc = ebml_header();
        doc.extend(open_master(&[0x18, 0x53, 0x80, 0x67]));
        doc.extend(open_master(&[0x1F, 0x43, 0xB6, 0x75]));
        doc.extend(simple_block(1, false));
        doc.extend(open_master(&[0x1F, 0x43, 0xB6, 0x75]));
        doc.extend(simple_block(1, true));

        let seen = collect(&doc).await;
        let clusters: Vec<_> = seen.iter().filter(|(n, _)| n == "Cluster").collect();
        assert_eq!(clusters.len(), 2);
        // Both clusters sit directly under Segment.
        assert!(clusters.iter().all(|(_, level)| *level == 1));
    }

    #[tokio::test]
    async fn test_reserialization_is_byte_exact() {
        let mut doc = ebml_header();
        doc.extend(open_master(&[0x18, 0x53, 0x80, 0x67]));
        doc.extend(open_master(&[0x1F, 0x43, 0xB6, 0x75]));
        doc.extend(leaf(&[0xE7], &[0x00]));
        doc.extend(simple_block(2, true));

        let mut tok = Tokenizer::new(&doc[..]);
        let mut out = BytesMut::new();
        loop {
            match tok.next().await {
                Ok(el) => el.write_to(&mut out),
                Err(Error::StreamEnded) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(&out[..], &doc[..]);
    }

    #[tokio::test]
    async fn test_unknown_id_passes_through_as_leaf() {
        let mut doc = ebml_header();
        doc.extend(leaf(&[0x66, 0x77], &[0x01, 0x02]));

        let mut tok = Tokenizer::new(&doc[..]);
        tok.next().await.unwrap(); // EBML
        tok.next().await.unwrap(); // DocType
        let el = tok.next().await.unwrap();
        assert_eq!(el.name(), "Unknown");
        assert_eq!(&el.to_bytes()[..], &leaf(&[0x66, 0x77], &[0x01, 0x02])[..]);
    }

    #[tokio::test]
    async fn test_truncated_payload_is_malformed() {
        let mut doc = leaf(&[0xE7], &[0x01, 0x02]);
        doc.truncate(doc.len() - 1);

        let mut tok = Tokenizer::new(&doc[..]);
        assert!(matches!(
            tok.next().await,
            Err(Error::MalformedStream(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_id_lead_byte() {
        let doc = [0x00u8, 0x81, 0x00];
        let mut tok = Tokenizer::new(&doc[..]);
        assert!(matches!(tok.next().await, Err(Error::MalformedStream(_))));
    }

    #[tokio::test]
    async fn test_empty_stream_ends_cleanly() {
        let mut tok = Tokenizer::new(&[][..]);
        assert!(matches!(tok.next().await, Err(Error::StreamEnded)));
    }

    #[tokio::test]
    async fn test_oversized_leaf_rejected() {
        // Timecode claiming a 2^40 byte payload.
        let doc = [0xE7u8, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut tok = Tokenizer::new(&doc[..]);
        assert!(matches!(tok.next().await, Err(Error::MalformedStream(_))));
    }
}
