//! SimpleBlock and Block payload decoding
//!
//! Block payload layout (big-endian where multi-byte):
//! ```text
//! +--------------+-------------+----------+------------------+----------+
//! | TrackNumber  | Timecode(2) | Flags(1) | Lacing preambles | Frame(s) |
//! | (EBML varint)| i16         |          | (mode dependent) |          |
//! +--------------+-------------+----------+------------------+----------+
//! ```
//!
//! SimpleBlock flags: 0x80 keyframe, 0x08 invisible, 0x01 discardable,
//! `(flags >> 4) & 3` lacing mode.
//!
//! A Block carries no keyframe flag; this relay derives it from the byte at
//! offset 2 of the payload remaining after the lacing preambles
//! (`byte & 0x01 == 0` means keyframe). That rule is a compatibility choice
//! inherited from the streams this relay serves, not a claim about the
//! Matroska specification, which puts reference information in `BlockGroup`.
//!
//! Only `(track_number, keyframe)` leaves this module through [`key_block`];
//! the rest of the summary is parsed for completeness and logging.

use crate::ebml::schema;
use crate::ebml::varint;
use crate::ebml::Element;
use crate::error::{Error, Result};

/// Frame lacing mode, from `(flags >> 4) & 3`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lacing {
    None = 0,
    Xiph = 1,
    FixedSize = 2,
    Ebml = 3,
}

impl Lacing {
    pub fn from_flags(flags: u8) -> Self {
        match (flags >> 4) & 3 {
            0 => Lacing::None,
            1 => Lacing::Xiph,
            2 => Lacing::FixedSize,
            _ => Lacing::Ebml,
        }
    }
}

/// Summary of a SimpleBlock or Block payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub track_number: u64,
    pub timecode: i16,
    pub keyframe: bool,
    pub invisible: bool,
    /// SimpleBlock only; always false for Block
    pub discardable: bool,
    pub lacing: Lacing,
}

/// Decode a SimpleBlock payload
pub fn parse_simple_block(data: &[u8]) -> Result<BlockInfo> {
    let (track_number, used) =
        varint::parse(data).ok_or(Error::MalformedBlock("invalid track number varint"))?;
    let rest = &data[used..];
    if rest.len() < 3 {
        return Err(Error::MalformedBlock("payload too short"));
    }

    let timecode = i16::from_be_bytes([rest[0], rest[1]]);
    let flags = rest[2];

    Ok(BlockInfo {
        track_number,
        timecode,
        keyframe: flags & 0x80 == 0x80,
        invisible: flags & 0x08 == 0x08,
        discardable: flags & 0x01 == 0x01,
        lacing: Lacing::from_flags(flags),
    })
}

/// Decode a Block payload
pub fn parse_block(data: &[u8]) -> Result<BlockInfo> {
    let (track_number, used) =
        varint::parse(data).ok_or(Error::MalformedBlock("invalid track number varint"))?;
    let rest = &data[used..];
    if rest.len() < 3 {
        return Err(Error::MalformedBlock("payload too short"));
    }

    let timecode = i16::from_be_bytes([rest[0], rest[1]]);
    let flags = rest[2];
    let lacing = Lacing::from_flags(flags);
    let mut rest = &rest[3..];

    if lacing != Lacing::None {
        let frame_count = *rest
            .first()
            .ok_or(Error::MalformedBlock("missing lace frame count"))?;
        rest = &rest[1..];

        match lacing {
            Lacing::Xiph => {
                for _ in 0..frame_count {
                    loop {
                        let b = *rest
                            .first()
                            .ok_or(Error::MalformedBlock("truncated xiph lace sizes"))?;
                        rest = &rest[1..];
                        if b < 255 {
                            break;
                        }
                    }
                }
            }
            Lacing::Ebml => {
                for _ in 0..frame_count {
                    let (_, used) = varint::parse(rest)
                        .ok_or(Error::MalformedBlock("truncated ebml lace sizes"))?;
                    rest = &rest[used..];
                }
            }
            Lacing::FixedSize | Lacing::None => {}
        }
    }

    if rest.len() < 3 {
        return Err(Error::MalformedBlock("payload too short for keyframe bit"));
    }

    Ok(BlockInfo {
        track_number,
        timecode,
        keyframe: rest[2] & 0x01 == 0x00,
        invisible: flags & 0x08 == 0x08,
        discardable: false,
        lacing,
    })
}

/// If the element is a SimpleBlock or Block, return its track number and
/// whether it carries a keyframe. Any other element returns `None`.
pub fn key_block(el: &Element) -> Result<Option<(u64, bool)>> {
    let info = match el.id {
        schema::SIMPLE_BLOCK => parse_simple_block(el.payload())?,
        schema::BLOCK => parse_block(el.payload())?,
        _ => return Ok(None),
    };
    Ok(Some((info.track_number, info.keyframe)))
}
