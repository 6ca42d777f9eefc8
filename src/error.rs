//! Error types for the spigot client.

use crate::message::StatusCode;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client orchestration layer.
///
/// This layer performs no retries and no silent recovery: every failure is
/// either a deterministic guard-triggered stream failure or a pass-through
/// from a collaborator (transport, decoder, caller-supplied handler).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A body read was attempted after its response was disposed.
    #[error("response was disposed")]
    ResponseDisposed,

    /// A body read was attempted after the owning client was shut down.
    #[error("client was shut down")]
    ClientShutDown,

    /// A decode-on-success operation observed a non-success status.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(StatusCode),

    /// The entity decoder rejected the response body.
    #[error("decode failure: {0}")]
    Decode(String),

    /// The dispatcher failed to open a connection for a request.
    #[error("connect failure: {0}")]
    Connect(String),

    /// A caller-supplied handler failed.
    #[error("{0}")]
    Handler(String),
}

impl Error {
    /// Shorthand for a decode failure with a formatted message.
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode(message.into())
    }
}
