//! OpenAI-compatible provider.
//!
//! One [`OpenAiCompatibleProvider`] serves OpenAI and Ollama (which speaks
//! the same protocol under `/v1`). Requests and the SSE stream go through
//! [`async_openai`].
//!
//! The request is assembled in the chat-completions wire format and then
//! deserialized into async-openai's request type, so tool definitions,
//! assistant tool calls and tool results use exactly the shapes the API
//! documents.

pub mod config;
pub mod streaming;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::CreateChatCompletionRequest;
use futures_util::StreamExt;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use agentry_core::llm::provider::{LlmEventStream, LlmProvider};
use agentry_types::llm::{CompletionRequest, LlmError, Message, MessageRole};

use self::config::OpenAiCompatConfig;
use self::streaming::map_openai_stream;

/// Provider for any OpenAI-compatible chat completions API.
///
/// Does not implement `Debug`: the async-openai client holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
        }
    }

    fn wire_message(msg: &Message) -> Value {
        match msg.role {
            MessageRole::Assistant if !msg.tool_calls.is_empty() => {
                let tool_calls: Vec<Value> = msg
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.input.to_string(),
                            }
                        })
                    })
                    .collect();
                let content = (!msg.content.is_empty()).then(|| msg.content.clone());
                json!({"role": "assistant", "content": content, "tool_calls": tool_calls})
            }
            MessageRole::Tool => json!({
                "role": "tool",
                "content": msg.content,
                "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
            }),
            role => json!({"role": role.to_string(), "content": msg.content}),
        }
    }

    /// Build a streaming [`CreateChatCompletionRequest`] from a generic request.
    fn build_request(&self, request: &CompletionRequest) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut messages: Vec<Value> = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.extend(request.messages.iter().map(Self::wire_message));

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_completion_tokens": request.max_tokens,
            "stream": true,
            "stream_options": {"include_usage": true},
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.input_schema,
                        }
                    })
                })
                .collect();
        }

        serde_json::from_value(body).map_err(|e| LlmError::InvalidRequest(format!("chat request: {e}")))
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let oai_request = match self.build_request(&request) {
            Ok(req) => req,
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };
        tracing::debug!(
            provider = %self.provider_name,
            model = %oai_request.model,
            tools = request.tools.len(),
            "openai-compatible stream request"
        );

        let client = self.client.clone();
        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);
            while let Some(event) = inner.next().await {
                yield event?;
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited
            } else if code == "context_length_exceeded" || error_type == "invalid_request_error" {
                LlmError::InvalidRequest(api_err.message.clone())
            } else if code == "server_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited,
            Some(503 | 529) => LlmError::Overloaded(err.to_string()),
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => LlmError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}
