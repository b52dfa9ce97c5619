//! # agent-server
//!
//! Axum server exposing the field agent over HTTP with streamed turns.
//!
//! ```text
//! POST   /api/sessions              {user_id}          -> {session_id}
//! GET    /api/sessions/{id}                            -> session + history
//! DELETE /api/sessions/{id}
//! POST   /api/sessions/{id}/query   {user_id, message} -> SSE turn events
//! GET    /api/tools                                    -> tool schemas
//! GET    /health
//! ```

pub mod config;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::{ServerConfig, ToolServerSettings};
pub use state::AppState;

use crate::handlers::{
    create_session, delete_session, get_session, health_check, list_tools, query_stream,
};

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/query", post(query_stream))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the fmt subscriber, filtered by `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
