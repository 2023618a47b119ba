//! WebM keeper
//!
//! Reads a broadcaster's WebM stream and tracks just enough state that a
//! viewer joining mid-stream can be handed a correctly formed stream: the
//! initialization prefix, and where the most recent safe entry point lies.
//!
//! Construction consumes the stream up to the first `Cluster`; everything
//! before it becomes the immutable header of the channel's [`Bootstrap`]
//! buffer, and the cluster header seeds the rolling body. After that,
//! [`Keeper::next`] turns each parsed element into a [`Fragment`] whose
//! marker tells the bootstrap buffer how to stay anchored at a random-access
//! point:
//!
//! - a `Cluster` anchors the body at its own start and resets per-cluster
//!   block tracking;
//! - a `SimpleBlock`/`Block` is counted per track; when the first block of
//!   each of the two tracks is a keyframe, the current cluster is a
//!   confirmed random-access point and the body rewinds to its anchor.
//!
//! The stream is assumed to carry exactly two tracks; a block naming any
//! other track is rejected as [`Error::ImpossibleTrack`] and kills the
//! channel.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncRead;

use crate::ebml::{schema, Element, ElementSource};
use crate::error::{Error, Result};
use crate::media::{block, Bootstrap, Marker};
use crate::registry::Fragment;

/// Per-channel stream parser and random-access-point tracker
#[derive(Debug)]
pub struct Keeper<R> {
    source: ElementSource<R>,
    bootstrap: Arc<Bootstrap>,
    /// Blocks seen per track within the current cluster, saturating at 255
    track_block_count: [u8; 2],
    /// Whether each track has shown a keyframe within the current cluster
    track_block_keyframe: [bool; 2],
}

impl<R: AsyncRead + Unpin> Keeper<R> {
    /// Read the stream up to and including the first `Cluster` header.
    ///
    /// Fails with [`Error::HeaderTooEarly`] if the stream ends before a
    /// cluster appears, or with the upstream parse error.
    pub async fn new(reader: R) -> Result<Self> {
        let mut source = ElementSource::new(reader);
        let mut header = BytesMut::with_capacity(4096);

        let first_cluster = loop {
            let el = match source.next().await {
                Ok(el) => el,
                Err(Error::StreamEnded) => return Err(Error::HeaderTooEarly),
                Err(e) => return Err(e),
            };
            if el.id == schema::CLUSTER {
                break el.to_bytes();
            }
            el.write_to(&mut header);
        };

        Ok(Self {
            source,
            bootstrap: Arc::new(Bootstrap::new(header.freeze(), first_cluster)),
            track_block_count: [0; 2],
            track_block_keyframe: [false; 2],
        })
    }

    /// Handle to the channel's bootstrap buffer.
    ///
    /// The registry applies every published fragment to it, so snapshots stay
    /// consistent with live delivery.
    pub fn bootstrap(&self) -> Arc<Bootstrap> {
        Arc::clone(&self.bootstrap)
    }

    /// Parse the next element and return it as a publishable fragment.
    pub async fn next(&mut self) -> Result<Fragment> {
        let el = self.source.next().await?;
        let marker = self.observe(&el)?;
        Ok(Fragment::new(el.to_bytes(), marker))
    }

    /// Random-access-point rule, applied before the element joins the body.
    fn observe(&mut self, el: &Element) -> Result<Marker> {
        if el.id == schema::CLUSTER {
            self.track_block_count = [0; 2];
            self.track_block_keyframe = [false; 2];
            return Ok(Marker::ClusterStart);
        }

        let Some((track, keyframe)) = block::key_block(el)? else {
            return Ok(Marker::None);
        };
        if !(1..=2).contains(&track) {
            return Err(Error::ImpossibleTrack(track));
        }
        let i = (track - 1) as usize;

        if self.track_block_count[i] < u8::MAX {
            self.track_block_count[i] += 1;
        }
        if keyframe {
            self.track_block_keyframe[i] = true;
        }

        // The cluster is a safe entry point once its first block on each
        // track is a keyframe.
        if self.track_block_count == [1, 1] && self.track_block_keyframe == [true, true] {
            Ok(Marker::RandomAccess)
        } else {
            Ok(Marker::None)
        }
    }
}
