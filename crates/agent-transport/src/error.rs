//! Transport Errors

use std::time::Duration;

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Handshake with {url} timed out after {timeout:?}")]
    HandshakeTimeout { url: String, timeout: Duration },

    #[error("No event from {url} for {timeout:?}")]
    IdleTimeout { url: String, timeout: Duration },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection closed: {0}")]
    Closed(String),

    /// JSON-RPC error returned by the server
    #[error("Remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

impl From<TransportError> for AgentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::HandshakeTimeout { url, timeout } => Self::HandshakeTimeout {
                server: url,
                timeout_ms: millis(timeout),
            },
            TransportError::IdleTimeout { url, timeout } => Self::TransportIdleTimeout {
                server: url,
                timeout_ms: millis(timeout),
            },
            // The server answered; the call itself was rejected
            TransportError::Remote { message, .. } => Self::ToolExecution(message),
            other => Self::Transport(other.to_string()),
        }
    }
}
