//! Adapter from async-openai's chat stream to [`StreamEvent`]s.
//!
//! Tool call arguments arrive as JSON fragments spread over many chunks,
//! keyed by tool call index. They are accumulated and emitted as
//! [`StreamEvent::ToolUseComplete`] once a finish reason arrives (or the
//! stream ends without one).

use std::collections::BTreeMap;

use async_openai::types::chat::{ChatCompletionResponseStream, FinishReason};
use futures_util::StreamExt;

use agentry_core::llm::provider::LlmEventStream;
use agentry_types::llm::{LlmError, StopReason, StreamEvent, Usage};

#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    json_buffer: String,
}

impl ToolCallAccumulator {
    fn finish(self) -> Result<StreamEvent, LlmError> {
        let input = if self.json_buffer.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&self.json_buffer).map_err(|e| {
                LlmError::Deserialization(format!("tool call JSON for '{}': {e}", self.name))
            })?
        };
        Ok(StreamEvent::ToolUseComplete {
            id: self.id,
            name: self.name,
            input,
        })
    }
}

fn stop_reason(reason: &FinishReason) -> StopReason {
    match reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ToolCalls => StopReason::ToolUse,
        FinishReason::ContentFilter => StopReason::EndTurn,
        FinishReason::FunctionCall => StopReason::ToolUse,
    }
}

/// Map an async-openai [`ChatCompletionResponseStream`] to provider events.
///
/// Order: `Connected`, then `TextDelta`s, `ToolUseComplete`s and a
/// `MessageDelta` per finish reason, `Usage` when the final chunk carries
/// it, and `Done`.
pub fn map_openai_stream(mut stream: ChatCompletionResponseStream) -> LlmEventStream {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut tool_accumulators: BTreeMap<u32, ToolCallAccumulator> = BTreeMap::new();

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            if let Some(usage) = &chunk.usage {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in chunk.choices {
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    yield StreamEvent::TextDelta { text };
                }

                for tc in choice.delta.tool_calls.unwrap_or_default() {
                    let acc = tool_accumulators.entry(tc.index).or_default();
                    if let Some(id) = tc.id.filter(|id| !id.is_empty()) {
                        acc.id = id;
                    }
                    if let Some(function) = tc.function {
                        if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                            acc.name = name;
                        }
                        if let Some(arguments) = function.arguments {
                            acc.json_buffer.push_str(&arguments);
                        }
                    }
                }

                if let Some(finish_reason) = choice.finish_reason {
                    for (_, acc) in std::mem::take(&mut tool_accumulators) {
                        yield acc.finish()?;
                    }
                    yield StreamEvent::MessageDelta {
                        stop_reason: stop_reason(&finish_reason),
                    };
                }
            }
        }

        for (_, acc) in std::mem::take(&mut tool_accumulators) {
            yield acc.finish()?;
        }
        yield StreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulated_fragments_parse() {
        let mut acc = ToolCallAccumulator {
            id: "call_abc".to_string(),
            name: "search_docs".to_string(),
            json_buffer: String::new(),
        };
        acc.json_buffer.push_str("{\"query\":");
        acc.json_buffer.push_str(" \"rust async\"}");

        match acc.finish().unwrap() {
            StreamEvent::ToolUseComplete { id, input, .. } => {
                assert_eq!(id, "call_abc");
                assert_eq!(input["query"], "rust async");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_empty_arguments_become_empty_object() {
        let acc = ToolCallAccumulator {
            id: "call_1".to_string(),
            name: "noop".to_string(),
            json_buffer: String::new(),
        };
        assert!(matches!(
            acc.finish().unwrap(),
            StreamEvent::ToolUseComplete { input, .. } if input == serde_json::json!({})
        ));
    }

    #[test]
    fn test_invalid_arguments_are_deserialization_errors() {
        let acc = ToolCallAccumulator {
            id: "call_1".to_string(),
            name: "search_docs".to_string(),
            json_buffer: "{\"query\":".to_string(),
        };
        assert!(matches!(acc.finish(), Err(LlmError::Deserialization(msg)) if msg.contains("search_docs")));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(stop_reason(&FinishReason::ToolCalls), StopReason::ToolUse);
        assert_eq!(stop_reason(&FinishReason::Length), StopReason::MaxTokens);
        assert_eq!(stop_reason(&FinishReason::Stop), StopReason::EndTurn);
    }
}
