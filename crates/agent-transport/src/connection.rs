//! Client Connection
//!
//! One [`TransportConnection`] per remote tool server. The connection is a
//! small state machine driven entirely by its callers:
//!
//! ```text
//!            connect()                 handshake ok
//! Closed ─────────────▶ Connecting ─────────────────▶ Open ── close() ──▶ Closed
//!   ▲                       │                          │
//!   │ reset() / close()     │ handshake timeout /      │ idle timeout /
//!   │                       ▼ protocol error           ▼ protocol error
//! Failed(kind) ◀────────────┴──────────────────────────┘
//! ```
//!
//! A failure is sticky for the rest of a turn; the turn's closing of its
//! transports returns the connection to `Closed`.
//!
//! There is no background reader. Whoever holds the `live` lock reads the
//! event stream until its own response arrives; responses for other ids are
//! stashed for their owner.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;

use agent_core::ToolTransport;
use agent_core::tool::Arguments;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::protocol::{
    CallToolParams, CallToolResult, EVENT_CLOSE, EVENT_ENDPOINT, EVENT_MESSAGE, EVENT_PING,
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    METHOD_CALL_TOOL, METHOD_INITIALIZE, METHOD_LIST_TOOLS, METHOD_SHUTDOWN, RemoteToolSpec,
    SessionParams,
};

type EventStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Event, EventStreamError<reqwest::Error>>> + Send>>;

/// Why a connection failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    HandshakeTimeout,
    IdleTimeout,
    Protocol,
}

/// Connection lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// Not connected; the next call reconnects
    Closed,
    /// Sticky until [`TransportConnection::reset`] or `close`
    Failed(FailureKind),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Failed(kind) => write!(f, "failed ({kind:?})"),
        }
    }
}

struct Live {
    events: EventStream,
    endpoint: Url,
    session_id: String,
    stash: HashMap<u64, JsonRpcResponse>,
}

/// Client connection to a remote tool server
pub struct TransportConnection {
    id: String,
    config: TransportConfig,
    client: Client,
    state: Mutex<ConnectionState>,
    live: tokio::sync::Mutex<Option<Live>>,
    tools: RwLock<Vec<RemoteToolSpec>>,
    next_id: AtomicU64,
}

impl TransportConnection {
    /// Create a connection. Nothing is sent until the first `connect` or call.
    pub fn new(config: TransportConfig) -> Result<Self> {
        Url::parse(&config.url)
            .map_err(|e| TransportError::InvalidConfig(format!("url {}: {e}", config.url)))?;

        let mut headers = HeaderMap::new();
        for header in &config.headers {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|e| TransportError::InvalidConfig(format!("header name: {e}")))?;
            let value = HeaderValue::from_str(&header.value)
                .map_err(|e| TransportError::InvalidConfig(format!("header value: {e}")))?;
            headers.insert(name, value);
        }
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            client,
            state: Mutex::new(ConnectionState::Closed),
            live: tokio::sync::Mutex::new(None),
            tools: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != state {
            tracing::debug!(connection = %self.id, from = %*current, to = %state, "Transport state");
            *current = state;
        }
    }

    /// Tools advertised by the last successful handshake
    pub fn tools(&self) -> Vec<RemoteToolSpec> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Clear a failure so the next call reconnects
    pub fn reset(&self) {
        if matches!(self.state(), ConnectionState::Failed(_)) {
            self.set_state(ConnectionState::Closed);
        }
    }

    /// Connect (if needed) and return the advertised tools
    pub async fn connect(&self) -> Result<Vec<RemoteToolSpec>> {
        let mut live = self.live.lock().await;
        self.ensure_open(&mut live).await?;
        Ok(self.tools())
    }

    /// Invoke a remote tool, connecting lazily
    pub async fn call_tool(&self, name: &str, arguments: Arguments) -> Result<CallToolResult> {
        let mut guard = self.live.lock().await;
        self.ensure_open(&mut guard).await?;
        let Some(live) = guard.as_mut() else {
            return Err(TransportError::Closed(self.config.url.clone()));
        };

        let params = CallToolParams {
            session_id: live.session_id.clone(),
            name: name.to_string(),
            arguments,
        };
        tracing::debug!(connection = %self.id, tool = %name, "Remote call");

        let outcome = self
            .request(live, METHOD_CALL_TOOL, &params, Some(self.config.idle_read_timeout))
            .await;
        match outcome {
            Ok(value) => Ok(serde_json::from_value(value)?),
            Err(err) => {
                match &err {
                    // The server answered; the connection is fine
                    TransportError::Remote { .. } => {}
                    TransportError::IdleTimeout { .. } => {
                        tracing::warn!(connection = %self.id, tool = %name, "Idle read timeout");
                        *guard = None;
                        self.set_state(ConnectionState::Failed(FailureKind::IdleTimeout));
                    }
                    _ => {
                        tracing::warn!(connection = %self.id, error = %err, "Transport failed");
                        *guard = None;
                        self.set_state(ConnectionState::Failed(FailureKind::Protocol));
                    }
                }
                Err(err)
            }
        }
    }

    /// Release the server-side session. Best effort, bounded by `shutdown_timeout`.
    ///
    /// Also clears a failure, so the next call after a close reconnects.
    pub async fn close(&self) {
        let mut guard = self.live.lock().await;
        let Some(live) = guard.take() else {
            self.reset();
            return;
        };
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            METHOD_SHUTDOWN,
            serde_json::to_value(SessionParams {
                session_id: live.session_id.clone(),
            })
            .ok(),
        );
        let send = self.client.post(live.endpoint.clone()).json(&request).send();
        match tokio::time::timeout(self.config.shutdown_timeout, send).await {
            Ok(Ok(_)) => tracing::info!(connection = %self.id, "Transport closed"),
            Ok(Err(e)) => tracing::warn!(connection = %self.id, error = %e, "Shutdown failed"),
            Err(_) => tracing::warn!(connection = %self.id, "Shutdown timed out"),
        }
        drop(live);
        if matches!(self.state(), ConnectionState::Open | ConnectionState::Failed(_)) {
            self.set_state(ConnectionState::Closed);
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn failure(&self, kind: FailureKind) -> TransportError {
        match kind {
            FailureKind::HandshakeTimeout => TransportError::HandshakeTimeout {
                url: self.config.url.clone(),
                timeout: self.config.handshake_timeout,
            },
            FailureKind::IdleTimeout => TransportError::IdleTimeout {
                url: self.config.url.clone(),
                timeout: self.config.idle_read_timeout,
            },
            FailureKind::Protocol => {
                TransportError::Closed(format!("{} failed earlier", self.config.url))
            }
        }
    }

    async fn ensure_open(&self, live: &mut Option<Live>) -> Result<()> {
        match self.state() {
            ConnectionState::Failed(kind) => return Err(self.failure(kind)),
            ConnectionState::Open if live.is_some() => return Ok(()),
            _ => {}
        }

        self.set_state(ConnectionState::Connecting);
        tracing::info!(connection = %self.id, url = %self.config.url, "Connecting to tool server");

        match tokio::time::timeout(self.config.handshake_timeout, self.handshake()).await {
            Ok(Ok((connected, tools))) => {
                tracing::info!(
                    connection = %self.id,
                    session = %connected.session_id,
                    tools = tools.len(),
                    "Tool server connected"
                );
                *self.tools.write().unwrap_or_else(PoisonError::into_inner) = tools;
                *live = Some(connected);
                self.set_state(ConnectionState::Open);
                Ok(())
            }
            Ok(Err(err)) => {
                tracing::warn!(connection = %self.id, error = %err, "Handshake failed");
                self.set_state(ConnectionState::Failed(FailureKind::Protocol));
                Err(err)
            }
            Err(_) => {
                tracing::warn!(connection = %self.id, "Handshake timed out");
                self.set_state(ConnectionState::Failed(FailureKind::HandshakeTimeout));
                Err(self.failure(FailureKind::HandshakeTimeout))
            }
        }
    }

    async fn handshake(&self) -> Result<(Live, Vec<RemoteToolSpec>)> {
        let response = self
            .client
            .get(&self.config.url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Protocol(format!(
                "event stream returned {}",
                response.status()
            )));
        }

        let mut events: EventStream = Box::pin(response.bytes_stream().eventsource());
        let endpoint = loop {
            match events.next().await {
                Some(Ok(event)) if event.event == EVENT_ENDPOINT => break event.data,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Protocol(e.to_string())),
                None => return Err(TransportError::Closed("stream ended before endpoint".into())),
            }
        };
        let endpoint = Url::parse(&self.config.url)
            .and_then(|base| base.join(endpoint.trim()))
            .map_err(|e| TransportError::Protocol(format!("bad endpoint {endpoint}: {e}")))?;

        let mut live = Live {
            events,
            endpoint,
            session_id: String::new(),
            stash: HashMap::new(),
        };

        let init: InitializeResult = serde_json::from_value(
            self.request(
                &mut live,
                METHOD_INITIALIZE,
                &InitializeParams {
                    client: env!("CARGO_PKG_NAME").into(),
                    user_id: self.config.user_id.clone(),
                },
                None,
            )
            .await?,
        )?;
        live.session_id.clone_from(&init.session_id);

        let session = SessionParams {
            session_id: init.session_id,
        };
        let listed: ListToolsResult = serde_json::from_value(
            self.request(&mut live, METHOD_LIST_TOOLS, &session, None).await?,
        )?;

        Ok((live, listed.tools))
    }

    async fn request<P: Serialize + Sync>(
        &self,
        live: &mut Live,
        method: &str,
        params: &P,
        idle: Option<Duration>,
    ) -> Result<Value> {
        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id, method, Some(serde_json::to_value(params)?));

        let send = self.client.post(live.endpoint.clone()).json(&request).send();
        let response = match idle {
            Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
                TransportError::IdleTimeout {
                    url: self.config.url.clone(),
                    timeout: limit,
                }
            })??,
            None => send.await?,
        };
        if !response.status().is_success() {
            return Err(TransportError::Protocol(format!(
                "{method} rejected with {}",
                response.status()
            )));
        }

        let reply = self.read_response(live, id, idle).await?;
        match reply.error {
            Some(error) => Err(TransportError::Remote {
                code: error.code,
                message: error.message,
            }),
            None => Ok(reply.result.unwrap_or(Value::Null)),
        }
    }

    /// Read events until the response for `id` arrives. With `idle` set, every
    /// gap between events is bounded; pings count as activity.
    async fn read_response(
        &self,
        live: &mut Live,
        id: u64,
        idle: Option<Duration>,
    ) -> Result<JsonRpcResponse> {
        loop {
            if let Some(reply) = live.stash.remove(&id) {
                return Ok(reply);
            }

            let next = match idle {
                Some(limit) => tokio::time::timeout(limit, live.events.next())
                    .await
                    .map_err(|_| TransportError::IdleTimeout {
                        url: self.config.url.clone(),
                        timeout: limit,
                    })?,
                None => live.events.next().await,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => return Err(TransportError::Protocol(e.to_string())),
                None => return Err(TransportError::Closed("event stream ended".into())),
            };

            match event.event.as_str() {
                EVENT_PING => tracing::trace!(connection = %self.id, "ping"),
                EVENT_MESSAGE | "" => {
                    let reply: JsonRpcResponse = serde_json::from_str(&event.data)?;
                    if reply.id == id {
                        return Ok(reply);
                    }
                    live.stash.insert(reply.id, reply);
                }
                EVENT_CLOSE => return Err(TransportError::Closed("server closed the stream".into())),
                other => tracing::debug!(connection = %self.id, event = %other, "Ignoring event"),
            }
        }
    }
}

impl fmt::Debug for TransportConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConnection")
            .field("id", &self.id)
            .field("url", &self.config.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        let Some(live) = self.live.get_mut().take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            METHOD_SHUTDOWN,
            serde_json::to_value(SessionParams {
                session_id: live.session_id.clone(),
            })
            .ok(),
        );
        let send = self.client.post(live.endpoint.clone()).json(&request).send();
        let timeout = self.config.shutdown_timeout;
        let id = self.id.clone();
        handle.spawn(async move {
            drop(live);
            if tokio::time::timeout(timeout, send).await.is_err() {
                tracing::debug!(connection = %id, "Background shutdown timed out");
            }
        });
    }
}

#[async_trait]
impl ToolTransport for TransportConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn server(&self) -> &str {
        &self.config.url
    }

    async fn close(&self) {
        Self::close(self).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_connection_starts_closed() {
        let conn = TransportConnection::new(TransportConfig::new("http://127.0.0.1:1/sse")).unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(conn.tools().is_empty());
    }

    #[test]
    fn test_rejects_bad_url_and_header() {
        assert!(matches!(
            TransportConnection::new(TransportConfig::new("not a url")),
            Err(TransportError::InvalidConfig(_))
        ));
        let config = TransportConfig::new("http://localhost/sse").header("bad header", "x");
        assert!(TransportConnection::new(config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_and_stays_failed() {
        let config = TransportConfig::new("http://127.0.0.1:1/sse")
            .handshake_timeout(Duration::from_secs(2));
        let conn = TransportConnection::new(config).unwrap();

        assert!(conn.connect().await.is_err());
        assert!(matches!(conn.state(), ConnectionState::Failed(_)));
        assert!(conn.call_tool("anything", Arguments::new()).await.is_err());

        conn.reset();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_clears_failure() {
        let config = TransportConfig::new("http://127.0.0.1:1/sse")
            .handshake_timeout(Duration::from_secs(2));
        let conn = TransportConnection::new(config).unwrap();

        assert!(conn.connect().await.is_err());
        assert!(matches!(conn.state(), ConnectionState::Failed(_)));

        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
