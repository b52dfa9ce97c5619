//! Decision Loop
//!
//! One turn alternates between asking the model for its next action and
//! dispatching the tool calls it requests:
//!
//! ```text
//! AwaitingModel ──text──────────────▶ Done
//!      │  ▲
//! tool calls │  results appended
//!      ▼  │
//!   Dispatching          (iteration cap) ──▶ Aborted
//! ```
//!
//! Tool calls from one decision run in the order requested and their results
//! are appended in that order. Dependencies between calls are left to the
//! model: every iteration sees only the history accumulated so far.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::StreamExt;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Decision, DecisionChunk, InferenceContext, LlmProvider};
use crate::session::{BusyPolicy, SessionId, SessionManager, TurnLease};
use crate::stream::{AbortReason, TurnEvent, TurnOutcome, TurnStream};
use crate::tool::{Tool, ToolOrigin, ToolRegistry, ToolResult, ToolSchema, ToolTransport};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Instructions given to the model on every call
    pub instructions: String,

    /// Maximum inference calls per turn before the turn is aborted
    pub max_iterations: usize,

    /// Behaviour when a turn starts on a busy session
    pub busy_policy: BusyPolicy,
}

/// Default bound on inference calls per turn
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            busy_policy: BusyPolicy::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

const DEFAULT_INSTRUCTIONS: &str = "You are a crisp, helpful assistant. \
You can answer questions and, if it helps, call tools to get data. \
Only call a tool if it is actually useful. When one tool needs the output of \
another, call them one step at a time and use the earlier results. \
After receiving tool results, synthesize them into a concise answer.";

/// Where a turn is in its state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    Dispatching,
    Done,
    Aborted,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingModel => "awaiting_model",
            Self::Dispatching => "dispatching",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Remote connections touched during a turn. Closed when the turn ends; if
/// the turn is cancelled mid-flight the close runs in the background.
#[derive(Default)]
struct TransportScope {
    open: HashMap<String, Arc<dyn ToolTransport>>,
}

impl TransportScope {
    fn track(&mut self, transport: &Arc<dyn ToolTransport>) {
        self.open
            .entry(transport.id().to_string())
            .or_insert_with(|| transport.clone());
    }

    async fn close_all(&mut self) {
        for (_, transport) in self.open.drain() {
            tracing::debug!(connection = %transport.id(), server = %transport.server(), "Closing transport");
            transport.close().await;
        }
    }
}

impl Drop for TransportScope {
    fn drop(&mut self) {
        if self.open.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(count = self.open.len(), "No runtime to close transports of a cancelled turn");
            return;
        };
        for (_, transport) in self.open.drain() {
            tracing::debug!(connection = %transport.id(), "Closing transport of cancelled turn");
            handle.spawn(async move { transport.close().await });
        }
    }
}

/// The main Agent struct. Cheap to clone; clones share provider, tools and sessions.
#[derive(Clone)]
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    sessions: Arc<SessionManager>,
    config: Arc<AgentConfig>,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        sessions: Arc<SessionManager>,
        config: AgentConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            tools,
            sessions,
            config: Arc::new(config),
        })
    }

    /// Create with default configuration and a fresh session manager
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            sessions: Arc::default(),
            config: Arc::default(),
        }
    }

    /// Start a turn on `session_id`.
    ///
    /// Fails up front with `SessionNotFound` or `SessionBusy`. Once the
    /// stream is returned the turn owns the session until the stream ends or
    /// is dropped, and it always ends in `FinalText` or `Aborted`.
    pub async fn run_turn(
        &self,
        session_id: &SessionId,
        user_text: impl Into<String>,
    ) -> Result<TurnStream> {
        let lease = self
            .sessions
            .begin_turn(session_id, self.config.busy_policy)
            .await?;
        Ok(TurnStream::new(self.clone().drive(lease, user_text.into())))
    }

    /// Run a turn to completion
    pub async fn ask(&self, session_id: &SessionId, user_text: impl Into<String>) -> Result<TurnOutcome> {
        Ok(self.run_turn(session_id, user_text).await?.outcome().await)
    }

    fn drive(
        self,
        lease: TurnLease,
        user_text: String,
    ) -> impl futures::Stream<Item = TurnEvent> + Send + 'static {
        let agent = self;
        async_stream::stream! {
            let session = lease.session_id().clone();
            let turn = lease.turn_index();
            let mut transports = TransportScope::default();
            let tools = agent.tools.schemas();
            let max_iterations = agent.config.max_iterations;

            let result: Result<String> = 'turn: {
                if let Err(e) = lease.append(Message::user(user_text)) {
                    break 'turn Err(e);
                }

                let mut iteration = 0;
                loop {
                    if iteration == max_iterations {
                        tracing::warn!(%session, turn, max_iterations, "Iteration cap reached");
                        break 'turn Err(AgentError::TurnAborted(max_iterations));
                    }
                    iteration += 1;
                    tracing::debug!(%session, turn, iteration, state = %TurnState::AwaitingModel, "Calling model");

                    let context = match agent.build_context(&lease, &tools) {
                        Ok(context) => context,
                        Err(e) => break 'turn Err(e),
                    };
                    let mut chunks = match agent.provider.infer_stream(&context).await {
                        Ok(chunks) => chunks,
                        Err(e) => break 'turn Err(inference_failure(e)),
                    };

                    let mut decision = None;
                    let mut streamed = String::new();
                    while let Some(chunk) = chunks.next().await {
                        match chunk {
                            Ok(DecisionChunk::Delta(delta)) => {
                                streamed.push_str(&delta);
                                yield TurnEvent::PartialText { delta };
                            }
                            Ok(DecisionChunk::Done(d)) => {
                                decision = Some(d);
                                break;
                            }
                            Err(e) => break 'turn Err(inference_failure(e)),
                        }
                    }
                    drop(chunks);

                    let calls = match decision {
                        None => {
                            break 'turn Err(AgentError::InferenceFailure(
                                "model stream ended without a decision".into(),
                            ));
                        }
                        Some(Decision::Text(text)) => {
                            match lease.append(Message::agent(text.clone())) {
                                Ok(_) => break 'turn Ok(text),
                                Err(e) => break 'turn Err(e),
                            }
                        }
                        Some(Decision::ToolCalls(calls)) if calls.is_empty() => {
                            break 'turn Err(AgentError::InferenceFailure(
                                "model returned neither text nor tool calls".into(),
                            ));
                        }
                        Some(Decision::ToolCalls(calls)) => calls,
                    };

                    // Text shown ahead of the tool calls stays in the history
                    let preamble = streamed.trim();
                    if !preamble.is_empty() {
                        if let Err(e) = lease.append(Message::agent(preamble.to_string())) {
                            break 'turn Err(e);
                        }
                    }

                    tracing::debug!(%session, turn, iteration, state = %TurnState::Dispatching, calls = calls.len(), "Dispatching tools");
                    for call in calls {
                        let origin = agent.tools.origin_of(&call.name);
                        if let Some(transport) = origin.as_ref().and_then(ToolOrigin::transport) {
                            transports.track(transport);
                        }
                        let origin = origin.map_or_else(|| "unknown".to_string(), |o| o.label());

                        yield TurnEvent::ToolCallStarted {
                            call_id: call.id.clone(),
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                            origin: origin.clone(),
                        };

                        let result = match agent.tools.invoke(&call).await {
                            Ok(result) => result,
                            Err(e) if e.is_transport() => break 'turn Err(e),
                            Err(e) => {
                                tracing::debug!(%session, tool = %call.name, error = %e, "Tool call rejected");
                                ToolResult::failure(e.to_string())
                            }
                        };

                        let (call_id, name) = (call.id.clone(), call.name.clone());
                        if let Err(e) = lease.append(Message::tool(call, result.clone(), origin)) {
                            break 'turn Err(e);
                        }
                        yield TurnEvent::ToolCallFinished { call_id, name, result };
                    }
                }
            };

            transports.close_all().await;

            match result {
                Ok(text) => {
                    tracing::info!(%session, turn, state = %TurnState::Done, "Turn finished");
                    yield TurnEvent::FinalText { text };
                }
                Err(e) => {
                    tracing::error!(%session, turn, state = %TurnState::Aborted, error = %e, "Turn aborted");
                    yield TurnEvent::Aborted { reason: AbortReason::from(&e) };
                }
            }
        }
    }

    fn build_context(&self, lease: &TurnLease, tools: &[ToolSchema]) -> Result<InferenceContext> {
        Ok(InferenceContext {
            instructions: self.config.instructions.clone(),
            messages: lease.history()?,
            tools: tools.to_vec(),
        })
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the session manager
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Get the inference provider
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn inference_failure(err: AgentError) -> AgentError {
    match err {
        AgentError::InferenceFailure(_) => err,
        other => AgentError::InferenceFailure(other.to_string()),
    }
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    sessions: Option<Arc<SessionManager>>,
    config: AgentConfig,
    error: Option<AgentError>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        if let Err(e) = self.tools.register(tool) {
            self.error.get_or_insert(e);
        }
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.instructions = instructions.into();
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.config.busy_policy = policy;
        self
    }

    pub fn build(self) -> Result<Agent> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Agent::new(
            provider,
            Arc::new(self.tools),
            self.sessions.unwrap_or_default(),
            self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::{ScriptStep, ScriptedProvider};
    use crate::stream::AbortKind;
    use crate::tool::{FunctionTool, ParameterSchema, ToolCall};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema(name: &str, params: &[(&str, &str)]) -> crate::tool::ToolSchema {
        crate::tool::ToolSchema {
            name: name.into(),
            description: format!("{name} tool"),
            parameters: params
                .iter()
                .map(|(p, t)| ParameterSchema::required(*p, *t, *p))
                .collect(),
            category: None,
            has_side_effects: false,
        }
    }

    fn weather_tools() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools
            .register(FunctionTool::new(
                schema("lookup_coordinates", &[("city", "string")]),
                |_| async { Ok(json!({"lat": 39.7, "lon": -104.9})) },
            ))
            .unwrap();
        tools
            .register(FunctionTool::new(
                schema("lookup_value", &[("lat", "number"), ("lon", "number")]),
                |_| async { Ok(json!(71.5)) },
            ))
            .unwrap();
        tools
    }

    fn calls(calls: Vec<ToolCall>) -> ScriptStep {
        Decision::ToolCalls(calls).into()
    }

    fn text(t: &str) -> ScriptStep {
        Decision::Text(t.into()).into()
    }

    fn agent(provider: Arc<ScriptedProvider>, tools: ToolRegistry) -> (Agent, SessionId) {
        let agent = AgentBuilder::new()
            .provider(provider)
            .tools(tools)
            .max_iterations(4)
            .build()
            .unwrap();
        let id = agent.sessions().create_session("tester").unwrap().id;
        (agent, id)
    }

    #[tokio::test]
    async fn test_two_step_dependency_scenario() {
        let provider = Arc::new(ScriptedProvider::new([
            calls(vec![ToolCall::new("lookup_coordinates", json!({"city": "Denver"}))]),
            calls(vec![ToolCall::new("lookup_value", json!({"lat": 39.7, "lon": -104.9}))]),
            text("It is 71.5°F in Denver."),
        ]));
        let (agent, id) = agent(provider.clone(), weather_tools());

        let events: Vec<_> = agent.run_turn(&id, "Weather in Denver?").await.unwrap().collect().await;
        assert_eq!(events.last(), Some(&TurnEvent::FinalText { text: "It is 71.5°F in Denver.".into() }));

        let history = agent.sessions().history(&id).unwrap();
        let roles: Vec<_> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Tool, Role::Agent]);
        assert!(history.iter().all(|m| m.turn_index == 1));

        // The second decision saw the first tool's result
        let contexts = provider.contexts();
        let seen = contexts[1].last().and_then(Message::tool_exchange).unwrap();
        assert_eq!(seen.result, ToolResult::success(json!({"lat": 39.7, "lon": -104.9})));
    }

    #[tokio::test]
    async fn test_results_appended_in_request_order() {
        let mut tools = ToolRegistry::new();
        for (name, delay) in [("slow", 40_u64), ("fast", 0)] {
            tools
                .register(FunctionTool::new(schema(name, &[]), move |_| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    Ok(json!(name))
                }))
                .unwrap();
        }
        let provider = Arc::new(ScriptedProvider::new([
            calls(vec![
                ToolCall::new("slow", json!({})).with_id("1"),
                ToolCall::new("fast", json!({})).with_id("2"),
                ToolCall::new("slow", json!({})).with_id("3"),
            ]),
            text("done"),
        ]));
        let (agent, id) = agent(provider, tools);

        assert!(agent.ask(&id, "go").await.unwrap().is_done());
        let ids: Vec<_> = agent
            .sessions()
            .history(&id)
            .unwrap()
            .iter()
            .filter_map(|m| m.tool_exchange().map(|t| t.call.id.clone()))
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_failing_tool_is_data_for_next_call() {
        let mut tools = ToolRegistry::new();
        tools
            .register(FunctionTool::new(
                schema("lookup_coordinates", &[("city", "string")]),
                |_| async { Err(anyhow::anyhow!("network error: connection refused").into()) },
            ))
            .unwrap();
        let provider = Arc::new(ScriptedProvider::new([
            calls(vec![ToolCall::new("lookup_coordinates", json!({"city": "Denver"}))]),
            text("Sorry, the lookup failed."),
        ]));
        let (agent, id) = agent(provider.clone(), tools);

        let outcome = agent.ask(&id, "Weather in Denver?").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Done("Sorry, the lookup failed.".into()));

        let contexts = provider.contexts();
        assert_eq!(contexts.len(), 2);
        let rendered = contexts[1].last().unwrap().render();
        assert!(rendered.contains("failed"));
        assert!(rendered.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_failure_message() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tools = ToolRegistry::new();
        let c = counter.clone();
        tools
            .register(FunctionTool::new(schema("known", &[]), move |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(null))
                }
            }))
            .unwrap();
        let provider = Arc::new(ScriptedProvider::new([
            calls(vec![ToolCall::new("imaginary", json!({}))]),
            text("ok"),
        ]));
        let (agent, id) = agent(provider, tools);

        let events: Vec<_> = agent.run_turn(&id, "hi").await.unwrap().collect().await;
        assert!(events.iter().any(|e| matches!(
            e,
            TurnEvent::ToolCallFinished { result: ToolResult::Failure { message }, .. }
                if message.contains("Unknown tool")
        )));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_iteration_cap_aborts() {
        let provider = Arc::new(ScriptedProvider::repeating(calls(vec![ToolCall::new(
            "lookup_coordinates",
            json!({"city": "Denver"}),
        )])));
        let (agent, id) = agent(provider.clone(), weather_tools());

        let outcome = agent.ask(&id, "loop forever").await.unwrap();
        let TurnOutcome::Aborted(reason) = outcome else {
            panic!("expected abort");
        };
        assert_eq!(reason.kind, AbortKind::TurnAborted);
        assert_eq!(provider.calls(), 4);

        // Session survives and accepts another turn
        assert!(agent.sessions().begin_turn(&id, BusyPolicy::Reject).await.is_ok());
    }

    #[tokio::test]
    async fn test_inference_failure_aborts_turn_not_session() {
        let provider = Arc::new(ScriptedProvider::new([
            ScriptStep::Fail("provider 503".into()),
            text("recovered"),
        ]));
        let (agent, id) = agent(provider, weather_tools());

        let first = agent.ask(&id, "one").await.unwrap();
        assert!(matches!(first, TurnOutcome::Aborted(r) if r.kind == AbortKind::InferenceFailure));
        let second = agent.ask(&id, "two").await.unwrap();
        assert_eq!(second, TurnOutcome::Done("recovered".into()));
        assert_eq!(agent.sessions().history(&id).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_partial_text_streamed_before_final() {
        let provider = Arc::new(ScriptedProvider::new([ScriptStep::Stream(
            vec!["Hi ".into(), "there".into()],
            Decision::Text("Hi there".into()),
        )]));
        let (agent, id) = agent(provider, ToolRegistry::new());

        let events: Vec<_> = agent.run_turn(&id, "hello").await.unwrap().collect().await;
        assert_eq!(
            events,
            vec![
                TurnEvent::PartialText { delta: "Hi ".into() },
                TurnEvent::PartialText { delta: "there".into() },
                TurnEvent::FinalText { text: "Hi there".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_text_streamed_before_tool_call_is_kept() {
        let provider = Arc::new(ScriptedProvider::new([
            ScriptStep::Stream(
                vec!["Let me look ".into(), "that up.".into()],
                Decision::ToolCalls(vec![ToolCall::new("lookup_coordinates", json!({"city": "Denver"}))]),
            ),
            text("Found it."),
        ]));
        let (agent, id) = agent(provider.clone(), weather_tools());

        assert!(agent.ask(&id, "Where is Denver?").await.unwrap().is_done());

        let history = agent.sessions().history(&id).unwrap();
        let roles: Vec<_> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Agent, Role::Tool, Role::Agent]);
        assert_eq!(history[1].text(), Some("Let me look that up."));

        let second = &provider.contexts()[1];
        assert!(second.messages.iter().any(|m| m.text() == Some("Let me look that up.")));
    }

    #[tokio::test]
    async fn test_concurrent_turn_is_rejected() {
        let provider = Arc::new(ScriptedProvider::new([text("first")]));
        let (agent, id) = agent(provider, ToolRegistry::new());

        let running = agent.run_turn(&id, "one").await.unwrap();
        let err = agent.run_turn(&id, "two").await.unwrap_err();
        assert!(matches!(err, AgentError::SessionBusy(_)));

        assert_eq!(running.outcome().await, TurnOutcome::Done("first".into()));
        let history = agent.sessions().history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text(), Some("one"));
    }

    #[tokio::test]
    async fn test_concurrent_turns_are_serialized_when_queued() {
        let provider = Arc::new(ScriptedProvider::new([text("a"), text("b")]));
        let agent = AgentBuilder::new()
            .provider(provider)
            .busy_policy(BusyPolicy::Queue)
            .build()
            .unwrap();
        let id = agent.sessions().create_session("tester").unwrap().id;

        let first = agent.run_turn(&id, "one").await.unwrap();
        let second = {
            let agent = agent.clone();
            let id = id.clone();
            tokio::spawn(async move { agent.ask(&id, "two").await.unwrap() })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(first.outcome().await, TurnOutcome::Done("a".into()));
        assert_eq!(second.await.unwrap(), TurnOutcome::Done("b".into()));

        let texts: Vec<_> = agent
            .sessions()
            .history(&id)
            .unwrap()
            .iter()
            .map(|m| m.text().unwrap_or_default().to_string())
            .collect();
        assert_eq!(texts, vec!["one", "a", "two", "b"]);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let agent = Agent::with_defaults(
            Arc::new(ScriptedProvider::new(Vec::new())),
            Arc::new(ToolRegistry::new()),
        );
        let err = agent
            .run_turn(&SessionId::from_string("missing"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancelled_turn_releases_session() {
        let provider = Arc::new(ScriptedProvider::new([
            calls(vec![ToolCall::new("lookup_coordinates", json!({"city": "Denver"}))]),
            text("never reached"),
        ]));
        let (agent, id) = agent(provider, weather_tools());

        let mut stream = agent.run_turn(&id, "hi").await.unwrap();
        let first = stream.next().await.unwrap();
        assert!(matches!(first, TurnEvent::ToolCallStarted { .. }));
        drop(stream);

        assert!(agent.sessions().begin_turn(&id, BusyPolicy::Reject).await.is_ok());
        let history = agent.sessions().history(&id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let result = AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(Vec::new())))
            .max_iterations(0)
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }
}
