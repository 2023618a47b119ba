//! Per-channel pub/sub fan-out
//!
//! The registry routes a channel's stream from its single publisher to every
//! live subscriber, and hands joiners the bootstrap bytes they need to start
//! playing mid-stream.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ChannelRegistry>
//!                  ┌────────────────────────────┐
//!                  │ channels: HashMap<path,    │
//!                  │   ChannelEntry {           │
//!                  │     bootstrap,             │
//!                  │     subscriber queues,     │
//!                  │   }                        │
//!                  │ >                          │
//!                  └─────────────┬──────────────┘
//!                                │
//!          ┌─────────────────────┼─────────────────────┐
//!          │                     │                     │
//!          ▼                     ▼                     ▼
//!     [Publisher]          [Subscriber]          [Subscriber]
//!     keeper.next()        queue.recv()          queue.recv()
//!          │                     │                     │
//!          └──► registry.publish() ──► response writer ──► HTTP
//! ```
//!
//! Each entry's mutex is the channel's serialization point: a publish
//! applies the fragment to the bootstrap body and fans it out as one step,
//! and a subscribe snapshots the bootstrap and joins as one step. A joiner
//! therefore receives every byte exactly once, regardless of timing.
//!
//! Delivery is non-blocking: a subscriber whose bounded queue is full misses
//! that message; nobody else is affected. Payloads are `Bytes`, shared by
//! reference across queues.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{ChannelEntry, Subscription};
pub use error::RegistryError;
pub use frame::Fragment;
pub use store::ChannelRegistry;
