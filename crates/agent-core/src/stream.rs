//! Turn Events
//!
//! A turn surfaces its progress as an ordered, finite stream of
//! [`TurnEvent`]s that ends in exactly one `FinalText` or `Aborted`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::tool::{Arguments, ToolResult};

/// Why a turn ended without a final answer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortKind {
    TurnAborted,
    InferenceFailure,
    HandshakeTimeout,
    TransportIdleTimeout,
    Transport,
    Session,
}

/// Structured abort reason
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortReason {
    pub kind: AbortKind,
    pub message: String,
}

impl From<&AgentError> for AbortReason {
    fn from(err: &AgentError) -> Self {
        let kind = match err {
            AgentError::TurnAborted(_) => AbortKind::TurnAborted,
            AgentError::InferenceFailure(_)
            | AgentError::ProviderUnavailable(_)
            | AgentError::Parse(_) => AbortKind::InferenceFailure,
            AgentError::HandshakeTimeout { .. } => AbortKind::HandshakeTimeout,
            AgentError::TransportIdleTimeout { .. } => AbortKind::TransportIdleTimeout,
            AgentError::Transport(_) => AbortKind::Transport,
            _ => AbortKind::Session,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Progress of a running turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    ToolCallStarted {
        call_id: String,
        name: String,
        arguments: Arguments,
        origin: String,
    },
    ToolCallFinished {
        call_id: String,
        name: String,
        result: ToolResult,
    },
    PartialText {
        delta: String,
    },
    FinalText {
        text: String,
    },
    Aborted {
        reason: AbortReason,
    },
}

impl TurnEvent {
    /// `FinalText` and `Aborted` end the stream
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalText { .. } | Self::Aborted { .. })
    }

    /// Short name, used as the SSE event name
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ToolCallStarted { .. } => "tool_call_started",
            Self::ToolCallFinished { .. } => "tool_call_finished",
            Self::PartialText { .. } => "partial_text",
            Self::FinalText { .. } => "final_text",
            Self::Aborted { .. } => "aborted",
        }
    }
}

/// How a turn ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Done(String),
    Aborted(AbortReason),
}

impl TurnOutcome {
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Lazy, finite, non-restartable stream of one turn's events.
///
/// Nothing runs until the first poll. Dropping the stream cancels the turn.
#[must_use = "a turn does nothing unless its stream is polled"]
pub struct TurnStream {
    inner: Pin<Box<dyn Stream<Item = TurnEvent> + Send>>,
    finished: bool,
}

impl TurnStream {
    pub fn new(inner: impl Stream<Item = TurnEvent> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
            finished: false,
        }
    }

    /// Drain the stream and return the terminal outcome
    pub async fn outcome(mut self) -> TurnOutcome {
        while let Some(event) = self.next().await {
            match event {
                TurnEvent::FinalText { text } => return TurnOutcome::Done(text),
                TurnEvent::Aborted { reason } => return TurnOutcome::Aborted(reason),
                _ => {}
            }
        }
        TurnOutcome::Aborted(AbortReason {
            kind: AbortKind::Session,
            message: "turn ended without a result".into(),
        })
    }
}

impl Stream for TurnStream {
    type Item = TurnEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<TurnEvent>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnStream")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_stops_after_terminal_event() {
        let events = vec![
            TurnEvent::PartialText { delta: "a".into() },
            TurnEvent::FinalText { text: "a".into() },
            TurnEvent::PartialText { delta: "late".into() },
        ];
        let collected: Vec<_> = TurnStream::new(futures::stream::iter(events)).collect().await;
        assert_eq!(collected.len(), 2);
        assert!(collected[1].is_terminal());
    }

    #[test]
    fn test_abort_reason_kinds() {
        let reason = AbortReason::from(&AgentError::TurnAborted(3));
        assert_eq!(reason.kind, AbortKind::TurnAborted);
        let reason = AbortReason::from(&AgentError::TransportIdleTimeout {
            server: "s".into(),
            timeout_ms: 1,
        });
        assert_eq!(reason.kind, AbortKind::TransportIdleTimeout);
    }

    #[test]
    fn test_event_serialization() {
        let value = serde_json::to_value(TurnEvent::FinalText { text: "hi".into() }).unwrap();
        assert_eq!(value["type"], "final_text");
        assert_eq!(value["text"], "hi");
    }
}
