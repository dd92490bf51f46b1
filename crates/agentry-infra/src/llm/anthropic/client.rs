//! [`AnthropicProvider`]: streaming completions against the Messages API.
//!
//! The API key is held as a [`SecretString`] and only exposed when the
//! request headers are built. The provider does not implement `Debug`.

use secrecy::SecretString;

use agentry_core::llm::provider::{LlmEventStream, LlmProvider};
use agentry_types::llm::{CompletionRequest, Message, MessageRole};

use super::streaming::create_anthropic_stream;
use super::types::{AnthropicMessage, AnthropicRequest, AnthropicTool, RequestBlock};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(client: reqwest::Client, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    /// Override the base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Convert a generic [`CompletionRequest`] into an [`AnthropicRequest`].
    ///
    /// System messages are folded into the top-level `system` field and
    /// consecutive tool results are merged into one user turn.
    fn to_anthropic_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let mut system: Vec<&str> = request.system.as_deref().into_iter().collect();
        let mut messages: Vec<AnthropicMessage> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                MessageRole::System => system.push(&msg.content),
                MessageRole::User => messages.push(AnthropicMessage {
                    role: "user",
                    content: vec![RequestBlock::Text {
                        text: msg.content.clone(),
                    }],
                }),
                MessageRole::Assistant => messages.push(assistant_message(msg)),
                MessageRole::Tool => {
                    let block = RequestBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.content.clone(),
                    };
                    let merge = matches!(messages.last(), Some(last) if last.role == "user"
                        && last.content.iter().all(|b| matches!(b, RequestBlock::ToolResult { .. })));
                    match messages.last_mut() {
                        Some(last) if merge => last.content.push(block),
                        _ => messages.push(AnthropicMessage {
                            role: "user",
                            content: vec![block],
                        }),
                    }
                }
            }
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        AnthropicRequest {
            model,
            max_tokens: request.max_tokens,
            messages,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            stream: true,
            temperature: request.temperature,
            tools: request
                .tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.input_schema.clone(),
                })
                .collect(),
        }
    }
}

fn assistant_message(msg: &Message) -> AnthropicMessage {
    let mut content = Vec::with_capacity(msg.tool_calls.len() + 1);
    if !msg.content.is_empty() {
        content.push(RequestBlock::Text {
            text: msg.content.clone(),
        });
    }
    content.extend(msg.tool_calls.iter().map(|call| RequestBlock::ToolUse {
        id: call.id.clone(),
        name: call.name.clone(),
        input: call.input.clone(),
    }));
    AnthropicMessage {
        role: "assistant",
        content,
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let body = self.to_anthropic_request(&request);
        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "anthropic stream request"
        );
        create_anthropic_stream(&self.client, &self.url("/v1/messages"), body, &self.api_key)
    }
}
