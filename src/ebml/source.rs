//! Filtered element source
//!
//! Wraps the tokenizer and hides subtrees the consumer has asked to skip.
//! Setting the skip level to a discarded element's level drops every deeper
//! element; the next element at or above that level clears the filter and is
//! emitted. The relay itself currently emits everything, but the mechanism
//! stays available for filtering elements such as `Void` or `SeekHead`.

use tokio::io::AsyncRead;

use crate::error::Result;

use super::element::Element;
use super::parser::Tokenizer;

/// Lazy sequence of EBML elements with subtree filtering
#[derive(Debug)]
pub struct ElementSource<R> {
    tokenizer: Tokenizer<R>,
    /// 0 means no filtering; otherwise elements strictly deeper than this
    /// level are discarded
    skip_level: usize,
}

impl<R: AsyncRead + Unpin> ElementSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            tokenizer: Tokenizer::new(reader),
            skip_level: 0,
        }
    }

    /// Discard every element nested deeper than `level` until the next
    /// element at or above it.
    pub fn skip_below(&mut self, level: usize) {
        self.skip_level = level;
    }

    /// Next element that survives the skip filter
    pub async fn next(&mut self) -> Result<Element> {
        loop {
            let el = self.tokenizer.next().await?;

            if self.skip_level > 0 && el.level > self.skip_level {
                continue;
            }
            if self.skip_level == el.level {
                self.skip_level = 0;
            }
            return Ok(el);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

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

    #[tokio::test]
    async fn test_emits_everything_by_default() {
        let mut doc = sized_master(&[0x1A, 0x45, 0xDF, 0xA3], &leaf(&[0x42, 0x82], b"webm"));
        doc.extend(leaf(&[0xEC], &[0x00])); // Void

        let mut source = ElementSource::new(&doc[..]);
        assert_eq!(source.next().await.unwrap().name(), "EBML");
        assert_eq!(source.next().await.unwrap().name(), "DocType");
        assert_eq!(source.next().await.unwrap().name(), "Void");
        assert!(matches!(source.next().await, Err(Error::StreamEnded)));
    }

    #[tokio::test]
    async fn test_skip_hides_descendants() {
        // SeekHead with one Seek child, then an Info sibling.
        let seek = sized_master(&[0x4D, 0xBB], &leaf(&[0x53, 0xAC], &[0x01]));
        let mut doc = Vec::new();
        doc.push(0x18);
        doc.extend([0x53, 0x80, 0x67, 0xFF]); // Segment, unknown size
        doc.extend(sized_master(&[0x11, 0x4D, 0x9B, 0x74], &seek));
        doc.extend(sized_master(&[0x15, 0x49, 0xA9, 0x66], &leaf(&[0x7B, 0xA9], b"t")));

        let mut source = ElementSource::new(&doc[..]);
        assert_eq!(source.next().await.unwrap().name(), "Segment");

        let seek_head = source.next().await.unwrap();
        assert_eq!(seek_head.name(), "SeekHead");
        source.skip_below(seek_head.level);

        // Seek (level 2) and SeekPosition (level 3) are dropped; the filter
        // clears on Info, the next element back at level 1.
        let el = source.next().await.unwrap();
        assert_eq!(el.name(), "Info");
        assert_eq!(source.next().await.unwrap().name(), "Title");
    }
}
