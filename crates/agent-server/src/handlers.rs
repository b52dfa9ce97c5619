//! HTTP/SSE Handlers

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use agent_core::{AgentError, Session, SessionId, ToolSchema};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub tools: usize,
    pub remote_servers: Vec<RemoteServerStatus>,
}

#[derive(Serialize)]
pub struct RemoteServerStatus {
    pub url: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

impl From<AgentError> for ErrorResponse {
    fn from(err: AgentError) -> Self {
        let code = match &err {
            AgentError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AgentError::SessionBusy(_) => "SESSION_BUSY",
            AgentError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            _ => "AGENT_ERROR",
        };
        Self {
            error: err.user_message(),
            code: code.into(),
        }
    }
}

fn agent_error(err: AgentError) -> ApiError {
    let status = match &err {
        AgentError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        AgentError::SessionBusy(_) => StatusCode::CONFLICT,
        AgentError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Agent error: {}", err);
    }
    (status, Json(err.into()))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.agent.provider();
    let provider_connected = provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: provider.name().to_string(),
        provider_connected,
        tools: state.agent.tools().len(),
        remote_servers: state
            .remotes
            .iter()
            .map(|c| RemoteServerStatus {
                url: c.url().to_string(),
                state: c.state().to_string(),
            })
            .collect(),
    })
}

/// Tool schemas the model sees
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolSchema>> {
    Json(state.agent.tools().schemas())
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    if payload.user_id.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_USER",
            "user_id must not be empty",
        ));
    }
    let session = state
        .agent
        .sessions()
        .create_session(payload.user_id)
        .map_err(agent_error)?;

    tracing::info!(session = %session.id, user = %session.user_id, "Session created");
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id.to_string(),
        }),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    state
        .agent
        .sessions()
        .get_session(&SessionId::from_string(id))
        .map(Json)
        .map_err(agent_error)
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .agent
        .sessions()
        .delete_session(&SessionId::from_string(id))
        .map_err(agent_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run one turn and stream its events.
///
/// Each SSE event is named after the turn event kind and carries it as JSON.
/// The stream closes after `final_text` or `aborted`. Disconnecting cancels
/// the turn.
pub async fn query_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session_id = SessionId::from_string(id);
    let session = state
        .agent
        .sessions()
        .get_session(&session_id)
        .map_err(agent_error)?;
    if session.user_id != payload.user_id {
        tracing::warn!(session = %session_id, user = %payload.user_id, "Session owned by another user");
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "SESSION_FORBIDDEN",
            "This session belongs to another user.",
        ));
    }

    let turn = state
        .agent
        .run_turn(&session_id, payload.message)
        .await
        .map_err(agent_error)?;

    let events = turn.map(|event| {
        let sse = Event::default().event(event.kind());
        Ok(match serde_json::to_string(&event) {
            Ok(json) => sse.data(json),
            Err(e) => {
                tracing::error!("Could not encode turn event: {}", e);
                sse.data(event.kind())
            }
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
