//! Error Types for Field Tools

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolsError>;

#[derive(Error, Debug)]
pub enum ToolsError {
    #[error("No match for {0}")]
    NotFound(String),

    #[error("{service} error: {message}")]
    Upstream { service: &'static str, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolsError {
    /// Upstream hiccups worth another try
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Upstream { .. } => true,
            _ => false,
        }
    }
}

/// Tool faults surface to the model as failure data
impl From<ToolsError> for AgentError {
    fn from(err: ToolsError) -> Self {
        Self::ToolExecution(err.to_string())
    }
}
