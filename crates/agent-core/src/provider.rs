//! Inference Provider Strategy Pattern
//!
//! The decision loop only talks to models through [`LlmProvider`]. A provider
//! receives the session history plus the available tool schemas and answers
//! with either final text or an ordered list of tool calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{InferenceContext, LlmProvider};
//!
//! let provider = OllamaProvider::new(config);
//! let decision = provider.infer(&context).await?;
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "gpt-4o")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

const fn default_temperature() -> f32 { 0.7 }
const fn default_max_tokens() -> u32 { 2048 }
const fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// Everything the model sees for one decision
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceContext {
    /// Agent instructions (system prompt)
    pub instructions: String,

    /// Session history, oldest first
    pub messages: Vec<Message>,

    /// Tools the model may call
    pub tools: Vec<ToolSchema>,
}

impl InferenceContext {
    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// The model's next action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Decision {
    /// Final answer for this turn
    Text(String),
    /// Tool calls to dispatch, in order
    ToolCalls(Vec<ToolCall>),
}

/// A chunk from a streaming decision
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionChunk {
    /// Partial answer text
    Delta(String),
    /// The complete decision; always the last chunk
    Done(Decision),
}

/// Stream type for streaming inference
pub type DecisionStream = Pin<Box<dyn Stream<Item = Result<DecisionChunk>> + Send>>;

/// Strategy trait for inference backends
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "Ollama")
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Decide the next action for the given context
    async fn infer(&self, context: &InferenceContext) -> Result<Decision>;

    /// Streaming variant; the default yields the whole decision at once
    async fn infer_stream(&self, context: &InferenceContext) -> Result<DecisionStream> {
        let decision = self.infer(context).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(DecisionChunk::Done(decision))
        })))
    }
}

/// One scripted model response
#[derive(Clone, Debug)]
pub enum ScriptStep {
    Decide(Decision),
    /// Stream these deltas, then decide
    Stream(Vec<String>, Decision),
    Fail(String),
}

impl From<Decision> for ScriptStep {
    fn from(decision: Decision) -> Self {
        Self::Decide(decision)
    }
}

/// Provider that replays a fixed list of responses and records every context
/// it was asked about. Used for demos and tests.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<ScriptStep>>,
    repeat_last: bool,
    seen: Mutex<Vec<InferenceContext>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedProvider {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            repeat_last: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same step
    pub fn repeating(step: impl Into<ScriptStep>) -> Self {
        Self {
            repeat_last: true,
            ..Self::new([step.into()])
        }
    }

    /// Contexts received so far, in call order
    pub fn contexts(&self) -> Vec<InferenceContext> {
        lock(&self.seen).clone()
    }

    /// Number of inference calls made
    pub fn calls(&self) -> usize {
        lock(&self.seen).len()
    }

    fn next_step(&self, context: &InferenceContext) -> Result<ScriptStep> {
        lock(&self.seen).push(context.clone());
        let mut steps = lock(&self.steps);
        let step = if self.repeat_last && steps.len() == 1 {
            steps.front().cloned()
        } else {
            steps.pop_front()
        };
        step.ok_or_else(|| AgentError::InferenceFailure("script exhausted".into()))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn infer(&self, context: &InferenceContext) -> Result<Decision> {
        match self.next_step(context)? {
            ScriptStep::Decide(decision) | ScriptStep::Stream(_, decision) => Ok(decision),
            ScriptStep::Fail(message) => Err(AgentError::InferenceFailure(message)),
        }
    }

    async fn infer_stream(&self, context: &InferenceContext) -> Result<DecisionStream> {
        let chunks: Vec<Result<DecisionChunk>> = match self.next_step(context)? {
            ScriptStep::Decide(decision) => vec![Ok(DecisionChunk::Done(decision))],
            ScriptStep::Stream(deltas, decision) => deltas
                .into_iter()
                .map(|d| Ok(DecisionChunk::Delta(d)))
                .chain(std::iter::once(Ok(DecisionChunk::Done(decision))))
                .collect(),
            ScriptStep::Fail(message) => return Err(AgentError::InferenceFailure(message)),
        };
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn context() -> InferenceContext {
        InferenceContext {
            instructions: String::new(),
            messages: vec![Message::user("hi")],
            tools: Vec::new(),
        }
    }

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "llama3.2");
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new([
            Decision::Text("one".into()).into(),
            ScriptStep::Fail("boom".into()),
        ]);

        assert_eq!(provider.infer(&context()).await.unwrap(), Decision::Text("one".into()));
        assert!(matches!(
            provider.infer(&context()).await,
            Err(AgentError::InferenceFailure(msg)) if msg == "boom"
        ));
        assert!(provider.infer(&context()).await.is_err());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_default_stream_ends_with_done() {
        let provider = ScriptedProvider::new([ScriptStep::Stream(
            vec!["Hel".into(), "lo".into()],
            Decision::Text("Hello".into()),
        )]);
        let chunks: Vec<_> = provider
            .infer_stream(&context())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], DecisionChunk::Done(Decision::Text("Hello".into())));
    }
}
