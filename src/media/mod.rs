//! Media-level handling for the relay
//!
//! This module provides:
//! - SimpleBlock/Block payload decoding (track number, keyframe bit)
//! - The bootstrap buffer handed to mid-stream joiners

pub mod block;
pub mod bootstrap;

pub use block::{key_block, BlockInfo, Lacing};
pub use bootstrap::{Bootstrap, Marker};
