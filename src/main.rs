//! webm-relay binary
//!
//! Serves the relay on `0.0.0.0:8090`, or on the address given as the first
//! argument:
//!
//! ```text
//! webm-relay 127.0.0.1:9090
//! ```
//!
//! Publish with e.g. ffmpeg and watch from any number of players:
//!
//! ```text
//! ffmpeg -re -i input -c:v libvpx -c:a libvorbis -f webm \
//!     http://localhost:8090/stream/demo
//! mpv http://localhost:8090/stream/demo
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use webm_relay::{ChannelRegistry, RelayConfig, RelayServer, WebmRelay};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<SocketAddr>() {
            Ok(addr) => RelayConfig::with_addr(addr),
            Err(e) => {
                eprintln!("invalid bind address {:?}: {}", arg, e);
                std::process::exit(2);
            }
        },
        None => RelayConfig::default(),
    };

    let registry = Arc::new(ChannelRegistry::new());
    let app = WebmRelay::new(Arc::clone(&registry)).read_buffer_size(config.read_buffer_size);
    let server = RelayServer::new(config, app, registry);

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "relay server exited");
        std::process::exit(1);
    }
}
