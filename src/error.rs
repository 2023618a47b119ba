//! Crate-wide error types
//!
//! Parse failures on a publisher stream are fatal to the channel they belong
//! to; registry-level errors live in [`crate::registry::RegistryError`].

use std::io;

/// Error type for stream parsing and keeper operations
#[derive(Debug)]
pub enum Error {
    /// The byte source was exhausted at an element boundary.
    StreamEnded,
    /// The tokenizer could not decode an element.
    MalformedStream(String),
    /// A SimpleBlock or Block payload could not be decoded.
    MalformedBlock(&'static str),
    /// The stream ended before the first Cluster.
    HeaderTooEarly,
    /// A block claimed a track number outside {1, 2}.
    ImpossibleTrack(u64),
    /// The peer closed the connection mid-stream.
    ClientGone,
    /// I/O error on the underlying byte source.
    Io(io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a `MalformedStream` error from anything displayable
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedStream(msg.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::StreamEnded => write!(f, "end of stream"),
            Error::MalformedStream(msg) => write!(f, "malformed stream: {}", msg),
            Error::MalformedBlock(msg) => write!(f, "malformed block: {}", msg),
            Error::HeaderTooEarly => write!(f, "stream ended before the first cluster"),
            Error::ImpossibleTrack(n) => write!(f, "impossible track number {}", n),
            Error::ClientGone => write!(f, "client went away mid-stream"),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
