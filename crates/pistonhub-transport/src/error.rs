//! Error types for the messaging transport.

use thiserror::Error;

/// A result type using `TransportError`.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while handing a command to the broker.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker connection is gone and no command can be queued.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The publish request was rejected by the client.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Invalid transport configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
