//! Error Types

use thiserror::Error;

use crate::tool::FieldViolation;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Tool name does not resolve in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with this name is already registered
    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),

    /// Arguments failed schema validation
    #[error("Invalid arguments for '{tool}': {}", format_violations(.violations))]
    InvalidArguments {
        tool: String,
        violations: Vec<FieldViolation>,
    },

    /// Tool handler reported a failure
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Remote tool server did not complete the handshake in time
    #[error("Handshake with '{server}' timed out after {timeout_ms}ms")]
    HandshakeTimeout { server: String, timeout_ms: u64 },

    /// Open transport went quiet for longer than the idle-read timeout
    #[error("Transport to '{server}' idle for more than {timeout_ms}ms")]
    TransportIdleTimeout { server: String, timeout_ms: u64 },

    /// Any other transport fault (protocol, HTTP, closed stream)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Session id is not known to the manager
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Another turn currently owns the session
    #[error("Session busy: {0}")]
    SessionBusy(String),

    /// Freshly allocated session id collided with an existing one
    #[error("Session id space exhausted")]
    SessionIdExhausted,

    /// Inference collaborator failed
    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Iteration cap exceeded in the decision loop
    #[error("Turn aborted after {0} iterations")]
    TurnAborted(usize),

    /// Parse error (e.g., tool call parsing)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Session store error
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_)
                | Self::SessionBusy(_)
                | Self::HandshakeTimeout { .. }
                | Self::TransportIdleTimeout { .. }
                | Self::Io(_)
        )
    }

    /// Transport-class errors terminate the turn instead of becoming tool data
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout { .. } | Self::TransportIdleTimeout { .. } | Self::Transport(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownTool(name) => format!("The tool '{name}' is not available."),
            Self::InvalidArguments { tool, .. } => format!("Invalid input for tool '{tool}'."),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::HandshakeTimeout { server, .. } => {
                format!("Could not reach the tool server at {server}.")
            }
            Self::TransportIdleTimeout { server, .. } => {
                format!("The tool server at {server} stopped responding.")
            }
            Self::Transport(_) => "The connection to a tool server failed.".into(),
            Self::SessionNotFound(_) => "That session does not exist.".into(),
            Self::SessionBusy(_) => {
                "This session is already answering another message. Please wait.".into()
            }
            Self::InferenceFailure(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::TurnAborted(_) => {
                "The request took too many steps to process. Please try a simpler query.".into()
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::ToolExecution(format!("{err:#}"))
    }
}
