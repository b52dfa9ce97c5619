//! Remote Agent Client
//!
//! Talks to a hosted agent over HTTP: creates sessions and streams turns back
//! as [`TurnEvent`]s.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use agent_core::TurnEvent;

use crate::error::{Result, TransportError};

pub type TurnEventStream = Pin<Box<dyn Stream<Item = Result<TurnEvent>> + Send>>;

#[derive(Serialize)]
struct CreateSession<'a> {
    user_id: &'a str,
}

#[derive(Deserialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Serialize)]
struct Query<'a> {
    user_id: &'a str,
    message: &'a str,
}

/// Client for a hosted agent
#[derive(Clone, Debug)]
pub struct RemoteAgentClient {
    base: Url,
    client: Client,
}

impl RemoteAgentClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidConfig(format!("url {base_url}: {e}")))?;
        Ok(Self {
            base,
            client: Client::new(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| TransportError::InvalidConfig(format!("path {path}: {e}")))
    }

    /// Create a session and return its id
    pub async fn create_session(&self, user_id: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/api/sessions")?)
            .json(&CreateSession { user_id })
            .send()
            .await?
            .error_for_status()?;
        let created: SessionCreated = response.json().await?;
        tracing::debug!(session = %created.session_id, user = %user_id, "Remote session created");
        Ok(created.session_id)
    }

    /// Send a message and stream the turn's events. The stream ends after
    /// the terminal event or when the server closes it.
    pub async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<TurnEventStream> {
        let response = self
            .client
            .post(self.url(&format!("/api/sessions/{session_id}/query"))?)
            .header(ACCEPT, "text/event-stream")
            .json(&Query { user_id, message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Protocol(format!("query rejected with {status}: {body}")));
        }

        let mut events = response.bytes_stream().eventsource();
        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) if event.data.is_empty() => {}
                    Ok(event) => match serde_json::from_str::<TurnEvent>(&event.data) {
                        Ok(turn_event) => {
                            let terminal = turn_event.is_terminal();
                            yield Ok(turn_event);
                            if terminal {
                                break;
                            }
                        }
                        Err(e) => {
                            yield Err(TransportError::Json(e));
                            break;
                        }
                    },
                    Err(e) => {
                        yield Err(TransportError::Protocol(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
