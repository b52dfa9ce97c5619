//! HTTP API driven through the router with a scripted model.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use agent_core::provider::{ScriptStep, ScriptedProvider};
use agent_core::{AgentBuilder, Decision, SessionId, ToolCall, ToolRegistry};
use agent_server::{AppState, router};
use field_tools::{FieldSources, register_field_tools};

fn app(steps: Vec<ScriptStep>) -> (Router, AppState) {
    let mut tools = ToolRegistry::new();
    register_field_tools(&mut tools, &FieldSources::mock(), None).unwrap();
    let agent = AgentBuilder::new()
        .provider(Arc::new(ScriptedProvider::new(steps)))
        .tools(tools)
        .build()
        .unwrap();
    let state = AppState::new(agent);
    (router(state.clone()), state)
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_session(app: &Router, user: &str) -> String {
    let response = app
        .clone()
        .oneshot(post("/api/sessions", &json!({"user_id": user})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    body["session_id"].as_str().unwrap().to_string()
}

/// `data:` payloads of an SSE body, in order
fn sse_data(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_query_streams_tool_calls_then_final_text() {
    let (app, _) = app(vec![
        ScriptStep::Decide(Decision::ToolCalls(vec![ToolCall::new(
            "suggest_clothing",
            json!({"temperature_f": 28.0}),
        )])),
        ScriptStep::Decide(Decision::Text("Bring a winter coat.".into())),
    ]);
    let id = create_session(&app, "ana").await;

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/sessions/{id}/query"),
            &json!({"user_id": "ana", "message": "Is it coat weather?"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    let body = body_text(response).await;
    assert!(body.contains("event: tool_call_started"));
    assert!(body.contains("event: final_text"));

    let events = sse_data(&body);
    let kinds: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert_eq!(kinds, vec!["tool_call_started", "tool_call_finished", "final_text"]);
    assert_eq!(events[2]["text"], "Bring a winter coat.");

    let response = app
        .oneshot(Request::get(format!("/api/sessions/{id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(session["user_id"], "ana");
    assert_eq!(session["history"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_model_call_ends_in_aborted_event() {
    let (app, _) = app(vec![ScriptStep::Fail("model offline".into())]);
    let id = create_session(&app, "ana").await;

    let response = app
        .oneshot(post(
            &format!("/api/sessions/{id}/query"),
            &json!({"user_id": "ana", "message": "hello"}),
        ))
        .await
        .unwrap();
    let events = sse_data(&body_text(response).await);
    let last = events.last().unwrap();
    assert_eq!(last["type"], "aborted");
    assert_eq!(last["reason"]["kind"], "inference_failure");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (app, _) = app(vec![]);
    let response = app
        .oneshot(post(
            "/api/sessions/missing/query",
            &json!({"user_id": "ana", "message": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_other_users_session_is_forbidden() {
    let (app, _) = app(vec![]);
    let id = create_session(&app, "ana").await;
    let response = app
        .oneshot(post(
            &format!("/api/sessions/{id}/query"),
            &json!({"user_id": "bo", "message": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_second_turn_on_busy_session_conflicts() {
    let (app, state) = app(vec![ScriptStep::Decide(Decision::Text("hi".into()))]);
    let id = create_session(&app, "ana").await;

    // Holding the stream keeps the session leased
    let running = state
        .agent
        .run_turn(&SessionId::from_string(id.clone()), "first")
        .await
        .unwrap();

    let response = app
        .oneshot(post(
            &format!("/api/sessions/{id}/query"),
            &json!({"user_id": "ana", "message": "second"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    drop(running);
}

#[tokio::test]
async fn test_empty_user_id_is_rejected() {
    let (app, _) = app(vec![]);
    let response = app
        .oneshot(post("/api/sessions", &json!({"user_id": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_tools_returns_schemas() {
    let (app, _) = app(vec![]);
    let response = app
        .oneshot(Request::get("/api/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let tools: Vec<Value> = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(tools.iter().any(|t| t["name"] == "lookup_coordinates"));
}
