//! Relay error types

use thiserror::Error;

/// Errors that can occur while talking to the orchestration backend
#[derive(Debug, Error)]
pub enum RelayError {
    /// Frame body could not be decoded into an event
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Connection-level failure (connect, read, body closed early)
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Frame rejected by the stream decoder
    #[error("Frame error: {0}")]
    Frame(String),

    /// Pull-request submission failed
    #[error("{0}")]
    Pr(String),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
