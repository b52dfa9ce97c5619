//! Tool-call extraction for text-only backends
//!
//! The model is told to answer with one fenced block per call:
//!
//! ````text
//! ```tool
//! {"tool": "lookup_coordinates", "arguments": {"city": "Denver"}}
//! ```
//! ````
//!
//! Anything else is a final answer.

use agent_core::provider::{DecisionChunk, DecisionStream};
use agent_core::{Decision, Result, ToolCall};
use futures::{Stream, StreamExt};

pub const TOOL_FENCE: &str = "```tool";
const FENCE_END: &str = "```";

/// Turn a raw completion into a decision
pub fn parse_decision(content: &str) -> Decision {
    let calls = parse_tool_calls(content);
    if calls.is_empty() {
        Decision::Text(content.trim().to_string())
    } else {
        Decision::ToolCalls(calls)
    }
}

/// Every fenced tool call, in order. Falls back to a single inline JSON
/// object with a `"tool"` key when there are no fences.
pub fn parse_tool_calls(content: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(TOOL_FENCE) {
        let body = &rest[start + TOOL_FENCE.len()..];
        let Some(end) = body.find(FENCE_END) else {
            break;
        };
        match serde_json::from_str::<ToolCall>(body[..end].trim()) {
            Ok(call) => calls.push(call),
            Err(e) => tracing::debug!(error = %e, "Skipping malformed tool block"),
        }
        rest = &body[end + FENCE_END.len()..];
    }

    if calls.is_empty() {
        calls.extend(parse_inline_tool_call(content));
    }
    calls
}

fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<ToolCall>(&content[start..=end]).ok()
}

/// Length of the prefix of `buffer` that is safe to show as answer text.
///
/// Stops at a tool fence, and holds back a trailing partial fence so it is
/// never streamed half-way.
pub fn visible_len(buffer: &str) -> usize {
    if let Some(idx) = buffer.find(TOOL_FENCE) {
        return idx;
    }
    let held = (1..TOOL_FENCE.len())
        .rev()
        .find(|&n| buffer.ends_with(&TOOL_FENCE[..n]))
        .unwrap_or(0);
    buffer.len() - held
}

/// Turn raw completion text, arriving in pieces, into decision chunks.
///
/// Answer text is passed on as deltas while it streams; anything from a tool
/// fence onwards is held until the end and parsed with the rest.
pub fn decision_stream<S>(mut pieces: S) -> DecisionStream
where
    S: Stream<Item = Result<String>> + Send + Unpin + 'static,
{
    Box::pin(async_stream::stream! {
        let mut buffer = String::new();
        let mut shown = 0;
        while let Some(piece) = pieces.next().await {
            match piece {
                Ok(piece) => buffer.push_str(&piece),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
            let visible = visible_len(&buffer);
            if visible > shown {
                yield Ok(DecisionChunk::Delta(buffer[shown..visible].to_string()));
                shown = visible;
            }
        }
        yield Ok(DecisionChunk::Done(parse_decision(&buffer)));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_multiple_fenced_calls_in_order() {
        let content = "Let me check.\n```tool\n{\"tool\": \"lookup_coordinates\", \"arguments\": {\"city\": \"Denver\"}}\n```\n\
                       ```tool\n{\"tool\": \"book_by_theme\", \"arguments\": {\"theme\": \"mountains\"}}\n```";
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "lookup_coordinates");
        assert_eq!(calls[0].arguments["city"], "Denver");
        assert_eq!(calls[1].name, "book_by_theme");
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn test_inline_fallback() {
        let calls = parse_tool_calls(r#"Sure: {"tool": "current_time", "arguments": {"city": "Oslo"}}"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "current_time");
    }

    #[test]
    fn test_plain_text_is_final_answer() {
        assert_eq!(
            parse_decision("  Wear a light jacket.  "),
            Decision::Text("Wear a light jacket.".into())
        );
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let content = "```tool\n{not json}\n```\n```tool\n{\"tool\": \"x\"}\n```";
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "x");
    }

    #[test]
    fn test_visible_len_holds_back_partial_fence() {
        assert_eq!(visible_len("It is 40F"), 9);
        assert_eq!(visible_len("Checking ``"), 9);
        assert_eq!(visible_len("Checking ```to"), 9);
        assert_eq!(visible_len("Checking ```tool\n{"), 9);
    }

    async fn collect(pieces: Vec<&str>) -> Vec<DecisionChunk> {
        let pieces: Vec<Result<String>> = pieces.into_iter().map(|p| Ok(p.to_string())).collect();
        decision_stream(futures::stream::iter(pieces))
            .map(|chunk| chunk.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_stream_holds_back_tool_block() {
        let chunks = collect(vec![
            "Let me ",
            "check. ``",
            "`tool\n{\"tool\": \"current_time\", ",
            "\"arguments\": {\"city\": \"Oslo\"}}\n```",
        ])
        .await;

        let deltas: String = chunks
            .iter()
            .filter_map(|c| match c {
                DecisionChunk::Delta(d) => Some(d.as_str()),
                DecisionChunk::Done(_) => None,
            })
            .collect();
        assert_eq!(deltas, "Let me check. ");
        match chunks.last() {
            Some(DecisionChunk::Done(Decision::ToolCalls(calls))) => {
                assert_eq!(calls[0].name, "current_time");
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_of_plain_answer() {
        let chunks = collect(vec!["Wear ", "a coat."]).await;
        assert_eq!(
            chunks,
            vec![
                DecisionChunk::Delta("Wear ".into()),
                DecisionChunk::Delta("a coat.".into()),
                DecisionChunk::Done(Decision::Text("Wear a coat.".into())),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_error_stops_without_decision() {
        let pieces = vec![
            Ok("partial".to_string()),
            Err(agent_core::AgentError::InferenceFailure("dropped".into())),
        ];
        let chunks: Vec<Result<DecisionChunk>> =
            decision_stream(futures::stream::iter(pieces)).collect().await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_err());
    }
}
