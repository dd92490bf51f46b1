//! SSE stream and event state machine for the Anthropic Messages API.
//!
//! Event order on the wire:
//! 1. `message_start`
//! 2. per block: `content_block_start`, N x `content_block_delta`, `content_block_stop`
//! 3. `message_delta` with the stop reason and cumulative usage
//! 4. `message_stop`
//!
//! `ping` may appear anywhere and `error` may arrive mid-stream. Tool input
//! arrives as `input_json_delta` fragments, accumulated per block index and
//! parsed on `content_block_stop`.

use std::collections::HashMap;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use agentry_core::llm::provider::LlmEventStream;
use agentry_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{
    AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ContentBlockStartPayload,
    ContentBlockStopPayload, ErrorPayload, MessageDeltaPayload, MessageStartPayload, ResponseBlock,
};

pub(crate) const API_VERSION: &str = "2023-06-01";

struct ToolUseAccumulator {
    id: String,
    name: String,
    json_buffer: String,
}

#[derive(Default)]
pub(crate) struct StreamState {
    tool_input_buffers: HashMap<u32, ToolUseAccumulator>,
}

fn parse<'a, T: serde::Deserialize<'a>>(event_type: &str, data: &'a str) -> Result<T, LlmError> {
    serde_json::from_str(data).map_err(|e| LlmError::Deserialization(format!("{event_type}: {e}")))
}

fn stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

/// Turn one SSE event into zero or more [`StreamEvent`]s.
pub(crate) fn process_event(
    event_type: &str,
    data: &str,
    state: &mut StreamState,
) -> Result<Vec<StreamEvent>, LlmError> {
    let mut events = Vec::new();

    match event_type {
        "message_start" => {
            let payload: MessageStartPayload = parse(event_type, data)?;
            tracing::trace!(message_id = %payload.message.id, "anthropic message started");
            if let Some(usage) = payload.message.usage {
                events.push(StreamEvent::Usage(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }));
            }
        }

        "content_block_start" => {
            let payload: ContentBlockStartPayload = parse(event_type, data)?;
            match payload.content_block {
                ResponseBlock::ToolUse { id, name } => {
                    state.tool_input_buffers.insert(
                        payload.index,
                        ToolUseAccumulator {
                            id,
                            name,
                            json_buffer: String::new(),
                        },
                    );
                }
                ResponseBlock::Text { text } if !text.is_empty() => {
                    events.push(StreamEvent::TextDelta { text });
                }
                _ => {}
            }
        }

        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload = parse(event_type, data)?;
            match payload.delta {
                AnthropicDelta::TextDelta { text } => events.push(StreamEvent::TextDelta { text }),
                AnthropicDelta::InputJsonDelta { partial_json } => {
                    if let Some(acc) = state.tool_input_buffers.get_mut(&payload.index) {
                        acc.json_buffer.push_str(&partial_json);
                    }
                }
                AnthropicDelta::Other => {}
            }
        }

        "content_block_stop" => {
            let payload: ContentBlockStopPayload = parse(event_type, data)?;
            if let Some(acc) = state.tool_input_buffers.remove(&payload.index) {
                let input = if acc.json_buffer.is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    serde_json::from_str(&acc.json_buffer).map_err(|e| {
                        LlmError::Deserialization(format!("tool input JSON for '{}': {e}", acc.name))
                    })?
                };
                events.push(StreamEvent::ToolUseComplete {
                    id: acc.id,
                    name: acc.name,
                    input,
                });
            }
        }

        "message_delta" => {
            let payload: MessageDeltaPayload = parse(event_type, data)?;
            events.push(StreamEvent::Usage(Usage {
                input_tokens: payload.usage.input_tokens,
                output_tokens: payload.usage.output_tokens,
            }));
            events.push(StreamEvent::MessageDelta {
                stop_reason: stop_reason(payload.delta.stop_reason.as_deref()),
            });
        }

        "message_stop" => events.push(StreamEvent::Done),

        "ping" => {}

        "error" => {
            let payload: ErrorPayload = parse(event_type, data)?;
            return Err(match payload.error.error_type.as_str() {
                "overloaded_error" => LlmError::Overloaded(payload.error.message),
                "rate_limit_error" => LlmError::RateLimited,
                "authentication_error" => LlmError::AuthenticationFailed,
                "invalid_request_error" => LlmError::InvalidRequest(payload.error.message),
                _ => LlmError::Provider {
                    message: payload.error.message,
                },
            });
        }

        unknown => {
            tracing::warn!(event_type = unknown, "unknown anthropic event type, skipping");
        }
    }

    Ok(events)
}

fn status_error(status: reqwest::StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited,
        400 => LlmError::InvalidRequest(body),
        529 => LlmError::Overloaded(body),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// Open a streaming request against the Messages API.
pub fn create_anthropic_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> LlmEventStream {
    let client = client.clone();
    let url = url.to_string();
    let api_key = api_key.clone();

    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "anthropic stream request rejected");
            Err(status_error(status, error_body))?;
        } else {
            yield StreamEvent::Connected;

            let mut state = StreamState::default();
            let mut finished = false;
            let mut sse = response.bytes_stream().eventsource();
            while let Some(event) = sse.next().await {
                let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
                for out in process_event(&event.event, &event.data, &mut state)? {
                    finished |= out == StreamEvent::Done;
                    yield out;
                }
                if finished {
                    break;
                }
            }
            if !finished {
                yield StreamEvent::Done;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[(&str, &str)]) -> Result<Vec<StreamEvent>, LlmError> {
        let mut state = StreamState::default();
        let mut out = Vec::new();
        for (event_type, data) in events {
            out.extend(process_event(event_type, data, &mut state)?);
        }
        Ok(out)
    }

    #[test]
    fn test_text_deltas() {
        let out = run(&[
            ("message_start", r#"{"message": {"id": "msg_1", "usage": {"input_tokens": 12}}}"#),
            ("content_block_start", r#"{"index": 0, "content_block": {"type": "text", "text": ""}}"#),
            ("ping", "{}"),
            ("content_block_delta", r#"{"index": 0, "delta": {"type": "text_delta", "text": "Hel"}}"#),
            ("content_block_delta", r#"{"index": 0, "delta": {"type": "text_delta", "text": "lo"}}"#),
            ("content_block_stop", r#"{"index": 0}"#),
            ("message_delta", r#"{"delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 2}}"#),
            ("message_stop", "{}"),
        ])
        .unwrap();

        let text: String = out
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello");
        assert!(out.contains(&StreamEvent::MessageDelta {
            stop_reason: StopReason::EndTurn
        }));
        assert_eq!(out.last(), Some(&StreamEvent::Done));
    }

    #[test]
    fn test_tool_use_accumulates_partial_json() {
        let out = run(&[
            (
                "content_block_start",
                r#"{"index": 1, "content_block": {"type": "tool_use", "id": "toolu_1", "name": "search_docs", "input": {}}}"#,
            ),
            ("content_block_delta", r#"{"index": 1, "delta": {"type": "input_json_delta", "partial_json": "{\"query\":"}}"#),
            ("content_block_delta", r#"{"index": 1, "delta": {"type": "input_json_delta", "partial_json": " \"rust\"}"}}"#),
            ("content_block_stop", r#"{"index": 1}"#),
        ])
        .unwrap();

        assert_eq!(
            out,
            vec![StreamEvent::ToolUseComplete {
                id: "toolu_1".to_string(),
                name: "search_docs".to_string(),
                input: serde_json::json!({"query": "rust"}),
            }]
        );
    }

    #[test]
    fn test_tool_use_without_input_is_empty_object() {
        let out = run(&[
            (
                "content_block_start",
                r#"{"index": 0, "content_block": {"type": "tool_use", "id": "t", "name": "noop", "input": {}}}"#,
            ),
            ("content_block_stop", r#"{"index": 0}"#),
        ])
        .unwrap();
        assert!(matches!(&out[0], StreamEvent::ToolUseComplete { input, .. } if input == &serde_json::json!({})));
    }

    #[test]
    fn test_error_event_maps_to_llm_error() {
        let err = run(&[(
            "error",
            r#"{"type": "error", "error": {"type": "overloaded_error", "message": "busy"}}"#,
        )])
        .unwrap_err();
        assert!(matches!(err, LlmError::Overloaded(msg) if msg == "busy"));
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(reqwest::StatusCode::UNAUTHORIZED, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            LlmError::Provider { message } if message.contains("boom")
        ));
    }
}
