//! HTTP surface of the relay
//!
//! This module provides:
//! - The [`RelayApp`] policy trait (`on_open` / `get_next` / `on_close`)
//! - The axum-based server driving publishers and subscribers
//! - The request-body byte source handed to publishers
//! - Server configuration

pub mod app;
pub mod body;
pub mod config;
pub mod http;

pub use app::{OpenRequest, Opened, Pull, RelayApp, Reply, Role};
pub use body::RequestBody;
pub use config::RelayConfig;
pub use http::RelayServer;
