//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Tools are
//! described in the system prompt and calls are parsed back out of the reply.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Decision, DecisionStream, GenerationOptions, InferenceContext, LlmProvider,
    },
    tool::render_tool_prompt,
};
use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, MessageRole, request::ChatMessageRequest},
    models::ModelOptions,
};

use crate::parse::{decision_stream, parse_decision};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Connection timeout in seconds
    pub timeout_secs: u64,

    /// Model and sampling options
    pub generation: GenerationOptions,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
            generation: GenerationOptions::default(),
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let model = std::env::var("OLLAMA_MODEL").unwrap_or(defaults.generation.model);

        Self {
            host,
            port,
            generation: GenerationOptions {
                model,
                ..defaults.generation
            },
            ..Self::default()
        }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// System prompt plus history in Ollama's chat format
    fn convert_messages(context: &InferenceContext) -> Vec<ChatMessage> {
        let mut system = context.instructions.clone();
        if !context.tools.is_empty() {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str(&render_tool_prompt(&context.tools));
        }

        std::iter::once(ChatMessage::new(MessageRole::System, system))
            .chain(context.messages.iter().map(Self::convert_message))
            .collect()
    }

    fn convert_message(message: &Message) -> ChatMessage {
        let role = match message.role {
            // Tool results appear as user context
            Role::User | Role::Tool => MessageRole::User,
            Role::Agent => MessageRole::Assistant,
        };
        ChatMessage::new(role, message.render())
    }

    /// Build Ollama generation options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }

    fn request(&self, context: &InferenceContext) -> ChatMessageRequest {
        let opts = &self.config.generation;
        ChatMessageRequest::new(opts.model.clone(), Self::convert_messages(context))
            .options(Self::build_options(opts))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn infer(&self, context: &InferenceContext) -> Result<Decision> {
        let response = self
            .client
            .send_chat_messages(self.request(context))
            .await
            .map_err(|e| AgentError::InferenceFailure(e.to_string()))?;

        Ok(parse_decision(&response.message.content))
    }

    async fn infer_stream(&self, context: &InferenceContext) -> Result<DecisionStream> {
        let chunks = self
            .client
            .send_chat_messages_stream(self.request(context))
            .await
            .map_err(|e| AgentError::InferenceFailure(e.to_string()))?;

        let pieces = chunks.map(|chunk| {
            chunk
                .map(|chunk| chunk.message.content)
                .map_err(|e| AgentError::InferenceFailure(format!("stream interrupted: {e:?}")))
        });
        Ok(decision_stream(pieces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{ToolCall, ToolResult, ToolSchema};
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.generation.model, "llama3.2");
    }

    #[test]
    fn test_message_conversion_puts_tools_in_system_prompt() {
        let context = InferenceContext {
            instructions: "You are helpful.".into(),
            messages: vec![
                Message::user("Weather in Denver?"),
                Message::tool(
                    ToolCall::new("lookup_coordinates", json!({"city": "Denver"})),
                    ToolResult::success(json!({"lat": 39.7, "lon": -104.9})),
                    "local",
                ),
            ],
            tools: vec![ToolSchema {
                name: "lookup_coordinates".into(),
                description: "Find a city".into(),
                parameters: Vec::new(),
                category: None,
                has_side_effects: false,
            }],
        };

        let converted = OllamaProvider::convert_messages(&context);
        assert_eq!(converted.len(), 3);
        assert!(converted[0].content.starts_with("You are helpful."));
        assert!(converted[0].content.contains("### lookup_coordinates"));
        assert!(converted[2].content.contains("[Tool 'lookup_coordinates' returned]"));
    }
}
