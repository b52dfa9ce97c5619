//! Conversation Messages
//!
//! Session history entries. History is append-only; the order of entries is
//! the order in which they were appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input
    User,
    /// Agent (model) response
    Agent,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// One tool call paired with the result it produced
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolExchange {
    pub call: ToolCall,
    pub result: ToolResult,
    /// `local` or the remote server the call was routed to
    pub origin: String,
}

/// Message body
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Tool(ToolExchange),
}

/// A single message in a session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text or structured tool payload
    pub content: Content,

    /// Turn that appended this message (assigned by the session manager)
    #[serde(default)]
    pub turn_index: usize,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: Content) -> Self {
        Self {
            role,
            content,
            turn_index: 0,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::Text(text.into()))
    }

    /// Create an agent message
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, Content::Text(text.into()))
    }

    /// Create a tool result message
    pub fn tool(call: ToolCall, result: ToolResult, origin: impl Into<String>) -> Self {
        Self::new(
            Role::Tool,
            Content::Tool(ToolExchange {
                call,
                result,
                origin: origin.into(),
            }),
        )
    }

    /// Text body, if this is a text message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Tool(_) => None,
        }
    }

    /// Tool exchange, if this is a tool message
    pub const fn tool_exchange(&self) -> Option<&ToolExchange> {
        match &self.content {
            Content::Tool(exchange) => Some(exchange),
            Content::Text(_) => None,
        }
    }

    /// Flatten to plain text for backends without structured tool messages
    pub fn render(&self) -> String {
        match &self.content {
            Content::Text(text) => text.clone(),
            Content::Tool(exchange) => {
                let verb = if exchange.result.is_success() { "returned" } else { "failed" };
                format!(
                    "[Tool '{}' {}]\n{}",
                    exchange.call.name,
                    verb,
                    exchange.result.render()
                )
            }
        }
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        // ~4 characters per token, +4 for role overhead
        u32::try_from(self.render().len() / 4).unwrap_or(u32::MAX).saturating_add(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), Some("Hello"));
        assert!(msg.tool_exchange().is_none());
    }

    #[test]
    fn test_tool_message_render() {
        let call = ToolCall::new("lookup_value", json!({"lat": 39.7, "lon": -104.9}));
        let ok = Message::tool(call.clone(), ToolResult::success(json!(71.2)), "local");
        assert_eq!(ok.role, Role::Tool);
        assert!(ok.render().starts_with("[Tool 'lookup_value' returned]"));

        let failed = Message::tool(call, ToolResult::failure("timeout"), "local");
        assert!(failed.render().contains("failed"));
        assert!(failed.render().ends_with("timeout"));
    }

    #[test]
    fn test_content_serialization_is_tagged() {
        let value = serde_json::to_value(Message::agent("done")).unwrap();
        assert_eq!(value["role"], "agent");
        assert_eq!(value["content"]["kind"], "text");
        assert_eq!(value["content"]["body"], "done");
    }
}
