//! Executor loop.
//!
//! Drives the model provider (and, when the agent has tools, the tool calls
//! it requests) and reports progress as a stream of [`InternalEvent`]s for
//! the state machine. Tool calls run sequentially, one at a time.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use agentry_types::llm::{CompletionRequest, Message, StreamEvent, ToolCall};
use agentry_types::tool::ToolOutput;

use super::state::InternalEvent;
use crate::llm::provider::DynLlmProvider;
use crate::tools::BoxTool;

/// Final answer when the tool loop hits its iteration bound.
pub const MAX_ITERATIONS_MESSAGE: &str = "Agent stopped due to max iterations.";

pub type InternalEventStream = Pin<Box<dyn Stream<Item = InternalEvent> + Send>>;

/// Everything one run needs. Lives only for the duration of the response.
pub struct Executor {
    pub provider: DynLlmProvider,
    pub model: String,
    pub system_prompt: String,
    pub tools: Vec<BoxTool>,
    pub max_iterations: u32,
    pub max_tokens: u32,
}

/// Result of streaming one model turn.
struct Turn {
    text: String,
    tool_calls: Vec<ToolCall>,
}

impl Executor {
    /// Run the executor. Agents without tools take the reduced path with a
    /// single model turn and no `ChainStart`.
    pub fn run(self, history: Vec<Message>, prompt: String) -> InternalEventStream {
        let mut messages = history;
        messages.push(Message::user(prompt));

        if self.tools.is_empty() {
            self.run_simple(messages)
        } else {
            self.run_with_tools(messages)
        }
    }

    fn request(&self, messages: &[Message]) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            system: (!self.system_prompt.is_empty()).then(|| self.system_prompt.clone()),
            max_tokens: self.max_tokens,
            temperature: Some(0.0),
            tools: self.tools.iter().map(|t| t.definition().clone()).collect(),
        }
    }

    fn run_simple(self, messages: Vec<Message>) -> InternalEventStream {
        Box::pin(async_stream::stream! {
            yield InternalEvent::ModelStart;

            let mut events = self.provider.stream(self.request(&messages));
            let mut text = String::new();
            while let Some(event) = events.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text: delta }) => {
                        text.push_str(&delta);
                        yield InternalEvent::ModelStream(delta);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        yield model_error(e);
                        return;
                    }
                }
            }

            yield InternalEvent::ModelEnd;
            yield InternalEvent::ChainEnd { output: text };
        })
    }

    fn run_with_tools(self, mut messages: Vec<Message>) -> InternalEventStream {
        Box::pin(async_stream::stream! {
            yield InternalEvent::ChainStart;

            for iteration in 0..self.max_iterations.max(1) {
                yield InternalEvent::ModelStart;

                let mut turn = Turn { text: String::new(), tool_calls: Vec::new() };
                let mut events = self.provider.stream(self.request(&messages));
                while let Some(event) = events.next().await {
                    match event {
                        Ok(StreamEvent::TextDelta { text }) => {
                            turn.text.push_str(&text);
                            yield InternalEvent::ModelStream(text);
                        }
                        Ok(StreamEvent::ToolUseComplete { id, name, input }) => {
                            turn.tool_calls.push(ToolCall { id, name, input });
                        }
                        Ok(_) => {}
                        Err(e) => {
                            yield model_error(e);
                            return;
                        }
                    }
                }

                yield InternalEvent::ModelEnd;

                if turn.tool_calls.is_empty() {
                    yield InternalEvent::ChainEnd { output: turn.text };
                    return;
                }

                tracing::debug!(iteration, calls = turn.tool_calls.len(), "model requested tools");
                messages.push(Message::assistant_tool_calls(turn.text, turn.tool_calls.clone()));

                for call in turn.tool_calls {
                    yield InternalEvent::ToolStart { name: call.name.clone(), input: call.input.clone() };

                    let output = match self.tools.iter().find(|t| t.name() == call.name) {
                        Some(tool) => tool.invoke(call.input.clone()).await,
                        None => ToolOutput::error(format!("Tool not found: {}", call.name)),
                    };
                    if output.is_error() {
                        tracing::info!(tool = %call.name, "tool returned an error result");
                    }

                    messages.push(Message::tool_result(call.id.clone(), output.to_value().to_string()));
                    yield InternalEvent::ToolEnd { name: call.name, input: call.input, output };
                }
            }

            tracing::warn!(max_iterations = self.max_iterations, "agent stopped due to max iterations");
            yield InternalEvent::ChainEnd { output: MAX_ITERATIONS_MESSAGE.to_string() };
        })
    }
}

fn model_error(e: agentry_types::llm::LlmError) -> InternalEvent {
    tracing::warn!(error = %e, "model stream failed");
    InternalEvent::Error {
        kind: "external_service_error",
        message: e.to_string(),
    }
}
