//! Tool Server
//!
//! Exposes a [`ToolRegistry`] over the SSE transport. Each `GET /sse` opens a
//! connection with its own outbound channel; requests POSTed to
//! `/messages?connection=<id>` are answered on that connection's stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use agent_core::{AgentError, ToolCall, ToolRegistry, ToolResult};

use crate::config::ToolServerConfig;
use crate::protocol::{
    CallToolParams, CallToolResult, EVENT_CLOSE, EVENT_ENDPOINT, EVENT_MESSAGE, EVENT_PING,
    INVALID_PARAMS, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, METHOD_CALL_TOOL, METHOD_INITIALIZE, METHOD_LIST_TOOLS, METHOD_NOT_FOUND,
    METHOD_SHUTDOWN, RemoteToolSpec, SessionParams, UNKNOWN_SESSION,
};

enum Outbound {
    Message(JsonRpcResponse),
    Close,
}

struct Connection {
    tx: mpsc::Sender<Outbound>,
    session: Option<String>,
}

/// Server-side state for one initialized client
#[derive(Clone, Debug)]
pub struct RemoteSession {
    pub id: String,
    pub user_id: String,
    pub connection: String,
    pub created_at: DateTime<Utc>,
}

struct Inner {
    config: ToolServerConfig,
    registry: Arc<ToolRegistry>,
    connections: RwLock<HashMap<String, Connection>>,
    sessions: RwLock<HashMap<String, RemoteSession>>,
}

/// Serves a tool registry to remote agents
#[derive(Clone)]
pub struct ToolServer {
    inner: Arc<Inner>,
}

impl ToolServer {
    pub fn new(config: ToolServerConfig, registry: Arc<ToolRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                connections: RwLock::new(HashMap::new()),
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/sse", get(open_stream))
            .route("/messages", post(handle_message))
            .with_state(self.clone())
    }

    /// Number of live remote sessions
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Live remote sessions for one user
    pub fn sessions_for(&self, user_id: &str) -> Vec<RemoteSession> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of open event streams
    pub fn active_connections(&self) -> usize {
        self.inner.connections.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn sender(&self, connection: &str) -> Option<mpsc::Sender<Outbound>> {
        self.inner
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(connection)
            .map(|c| c.tx.clone())
    }

    fn open_session(&self, connection: &str, user_id: String) -> RemoteSession {
        let session = RemoteSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            connection: connection.to_string(),
            created_at: Utc::now(),
        };
        let previous = self
            .inner
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(connection)
            .and_then(|c| c.session.replace(session.id.clone()));

        let mut sessions = self.inner.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = previous {
            sessions.remove(&previous);
        }
        sessions.insert(session.id.clone(), session.clone());
        tracing::info!(session = %session.id, user = %session.user_id, connection, "Remote session opened");
        session
    }

    fn has_session(&self, connection: &str, session_id: &str) -> bool {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .is_some_and(|s| s.connection == connection)
    }

    fn release_session(&self, session_id: &str) {
        if self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .is_some()
        {
            tracing::info!(session = %session_id, "Remote session released");
        }
    }

    fn drop_connection(&self, connection: &str) {
        let removed = self
            .inner
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection);
        if let Some(session) = removed.and_then(|c| c.session) {
            self.release_session(&session);
        }
        tracing::debug!(connection, "Event stream dropped");
    }

    async fn dispatch(&self, connection: &str, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;
        let params = request.params.unwrap_or(Value::Null);

        match request.method.as_str() {
            METHOD_INITIALIZE => match parse::<InitializeParams>(id, params) {
                Ok(init) => {
                    let session = self.open_session(connection, init.user_id);
                    respond(id, &InitializeResult {
                        server: self.inner.config.name.clone(),
                        session_id: session.id,
                    })
                }
                Err(reply) => reply,
            },
            METHOD_LIST_TOOLS => match self.session_params(id, connection, params) {
                Ok(_) => {
                    let tools = self.inner.registry.schemas().iter().map(RemoteToolSpec::from).collect();
                    respond(id, &ListToolsResult { tools })
                }
                Err(reply) => reply,
            },
            METHOD_CALL_TOOL => {
                let params = match parse::<CallToolParams>(id, params) {
                    Ok(params) => params,
                    Err(reply) => return reply,
                };
                if !self.has_session(connection, &params.session_id) {
                    return unknown_session(id, &params.session_id);
                }
                let call = ToolCall::new(params.name, Value::Object(params.arguments));
                self.call(id, &call).await
            }
            METHOD_SHUTDOWN => {
                if let Ok(session) = self.session_params(id, connection, params) {
                    self.release_session(&session.session_id);
                }
                JsonRpcResponse::ok(id, Value::Null)
            }
            other => JsonRpcResponse::err(id, METHOD_NOT_FOUND, format!("unknown method {other}")),
        }
    }

    fn session_params(
        &self,
        id: u64,
        connection: &str,
        params: Value,
    ) -> Result<SessionParams, JsonRpcResponse> {
        let session = parse::<SessionParams>(id, params)?;
        if self.has_session(connection, &session.session_id) {
            Ok(session)
        } else {
            Err(unknown_session(id, &session.session_id))
        }
    }

    async fn call(&self, id: u64, call: &ToolCall) -> JsonRpcResponse {
        tracing::debug!(tool = %call.name, "Serving tool call");
        match self.inner.registry.invoke(call).await {
            Ok(ToolResult::Success { data }) => respond(id, &CallToolResult {
                content: data,
                is_error: false,
            }),
            Ok(ToolResult::Failure { message }) => respond(id, &CallToolResult {
                content: Value::String(message),
                is_error: true,
            }),
            Err(err @ (AgentError::UnknownTool(_) | AgentError::InvalidArguments { .. })) => {
                JsonRpcResponse::err(id, INVALID_PARAMS, err.to_string())
            }
            Err(err) => respond(id, &CallToolResult {
                content: Value::String(err.to_string()),
                is_error: true,
            }),
        }
    }
}

fn parse<T: DeserializeOwned>(id: u64, params: Value) -> Result<T, JsonRpcResponse> {
    serde_json::from_value(params)
        .map_err(|e| JsonRpcResponse::err(id, INVALID_PARAMS, format!("invalid params: {e}")))
}

fn respond<T: serde::Serialize>(id: u64, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::ok(id, value),
        Err(e) => JsonRpcResponse::err(id, INVALID_PARAMS, e.to_string()),
    }
}

fn unknown_session(id: u64, session_id: &str) -> JsonRpcResponse {
    JsonRpcResponse::err(id, UNKNOWN_SESSION, format!("unknown session {session_id}"))
}

/// Removes the connection (and its session) when the event stream is dropped
struct ConnectionGuard {
    server: ToolServer,
    id: String,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.server.drop_connection(&self.id);
    }
}

async fn open_stream(
    State(server): State<ToolServer>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = uuid::Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::channel(server.inner.config.channel_capacity.max(1));
    server
        .inner
        .connections
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id.clone(), Connection { tx, session: None });
    tracing::debug!(connection = %id, "Event stream opened");

    let endpoint = format!("/messages?connection={id}");
    let heartbeat = server.inner.config.heartbeat_interval;
    let guard = ConnectionGuard { server, id };

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event(EVENT_ENDPOINT).data(endpoint));

        let mut ticker = heartbeat.map(|period| {
            tokio::time::interval_at(tokio::time::Instant::now() + period, period)
        });

        loop {
            let next = match ticker.as_mut() {
                Some(ticker) => tokio::select! {
                    message = rx.recv() => Some(message),
                    _ = ticker.tick() => None,
                },
                None => Some(rx.recv().await),
            };

            match next {
                None => yield Ok(Event::default().event(EVENT_PING).data(Utc::now().to_rfc3339())),
                Some(Some(Outbound::Message(reply))) => match serde_json::to_string(&reply) {
                    Ok(json) => yield Ok(Event::default().event(EVENT_MESSAGE).data(json)),
                    Err(e) => tracing::error!(error = %e, "Failed to encode response"),
                },
                Some(Some(Outbound::Close)) => {
                    yield Ok(Event::default().event(EVENT_CLOSE).data("bye"));
                    break;
                }
                Some(None) => break,
            }
        }
    };

    Sse::new(stream)
}

#[derive(Deserialize)]
struct MessageQuery {
    connection: String,
}

async fn handle_message(
    State(server): State<ToolServer>,
    Query(query): Query<MessageQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> StatusCode {
    let Some(tx) = server.sender(&query.connection) else {
        return StatusCode::NOT_FOUND;
    };

    let shutdown = request.method == METHOD_SHUTDOWN;

    // Calls may run long; answer on the stream when done
    tokio::spawn(async move {
        let reply = server.dispatch(&query.connection, request).await;
        if tx.send(Outbound::Message(reply)).await.is_err() {
            tracing::debug!(connection = %query.connection, "Stream gone before reply");
            return;
        }
        if shutdown {
            let _ = tx.send(Outbound::Close).await;
        }
    });

    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{FunctionTool, ParameterSchema, ToolSchema};
    use serde_json::json;

    fn server() -> ToolServer {
        let mut registry = ToolRegistry::new();
        registry
            .register(FunctionTool::new(
                ToolSchema {
                    name: "echo".into(),
                    description: "Echo text".into(),
                    parameters: vec![ParameterSchema::required("text", "string", "Text")],
                    category: None,
                    has_side_effects: false,
                },
                |call: ToolCall| async move { Ok(call.arguments["text"].clone()) },
            ))
            .unwrap();
        ToolServer::new(ToolServerConfig::default(), Arc::new(registry))
    }

    fn attach(server: &ToolServer, id: &str) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(4);
        server
            .inner
            .connections
            .write()
            .unwrap()
            .insert(id.into(), Connection { tx, session: None });
        rx
    }

    #[tokio::test]
    async fn test_calls_require_an_initialized_session() {
        let server = server();
        let _rx = attach(&server, "c1");

        let request = JsonRpcRequest::new(
            1,
            METHOD_CALL_TOOL,
            Some(json!({"session_id": "nope", "name": "echo", "arguments": {"text": "hi"}})),
        );
        let reply = server.dispatch("c1", request).await;
        assert_eq!(reply.error.unwrap().code, UNKNOWN_SESSION);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let server = server();
        let _rx = attach(&server, "c1");

        let init = JsonRpcRequest::new(1, METHOD_INITIALIZE, Some(json!({"client": "t", "user_id": "ana"})));
        let reply = server.dispatch("c1", init).await;
        let session: InitializeResult = serde_json::from_value(reply.result.unwrap()).unwrap();
        assert_eq!(server.sessions_for("ana").len(), 1);

        let call = JsonRpcRequest::new(
            2,
            METHOD_CALL_TOOL,
            Some(json!({"session_id": session.session_id, "name": "echo", "arguments": {"text": "hi"}})),
        );
        let reply = server.dispatch("c1", call).await;
        let result: CallToolResult = serde_json::from_value(reply.result.unwrap()).unwrap();
        assert_eq!(result.content, json!("hi"));
        assert!(!result.is_error);

        server.drop_connection("c1");
        assert_eq!(server.active_sessions(), 0);
        assert_eq!(server.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_bad_arguments_are_rpc_errors() {
        let server = server();
        let _rx = attach(&server, "c1");
        let init = JsonRpcRequest::new(1, METHOD_INITIALIZE, Some(json!({"client": "t", "user_id": "ana"})));
        let reply = server.dispatch("c1", init).await;
        let session: InitializeResult = serde_json::from_value(reply.result.unwrap()).unwrap();

        let call = JsonRpcRequest::new(
            2,
            METHOD_CALL_TOOL,
            Some(json!({"session_id": session.session_id, "name": "echo", "arguments": {}})),
        );
        let reply = server.dispatch("c1", call).await;
        assert_eq!(reply.error.unwrap().code, INVALID_PARAMS);
    }
}
