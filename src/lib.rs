//! Live WebM relay
//!
//! One broadcaster POSTs a continuous WebM stream to `/stream/<name>`; any
//! number of viewers GET the same path at any time and receive a stream that
//! is playable from their first byte. Two subsystems make mid-stream joining
//! of WebM possible:
//!
//! - the **keeper** incrementally parses the broadcaster's EBML, keeps the
//!   initialization prefix, and rolls a body buffer forward so it always
//!   starts at a random-access point (a Cluster whose first block per track
//!   is a keyframe);
//! - the **registry** fans each parsed element out to per-subscriber bounded
//!   queues, non-blocking, dropping on slow consumers, and hands joiners the
//!   keeper's bootstrap bytes atomically with their subscription.
//!
//! # Data flow
//!
//! ```text
//! POST body ──► ElementSource ──► Keeper ──► Fragment
//!                                              │
//!                                registry.publish(channel, ..)
//!                                              │
//!                          ┌───────────────────┼───────────────────┐
//!                          ▼                   ▼                   ▼
//!                   [queue cap 100]     [queue cap 100]     [queue cap 100]
//!                          │                   │                   │
//!                     GET response        GET response        GET response
//! ```
//!
//! A fresh GET first receives the channel's `header || body` bootstrap
//! snapshot, then live fragments from its queue.

pub mod ebml;
pub mod error;
pub mod keeper;
pub mod media;
pub mod registry;
pub mod relay;
pub mod server;

pub use error::{Error, Result};
pub use keeper::Keeper;
pub use registry::{ChannelRegistry, RegistryConfig};
pub use relay::WebmRelay;
pub use server::{RelayApp, RelayConfig, RelayServer};
