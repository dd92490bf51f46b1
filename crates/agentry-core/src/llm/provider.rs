//! LlmProvider trait definition.
//!
//! This is the core abstraction that all LLM providers implement. The only
//! operation the orchestration engine needs is a streaming completion, so the
//! trait is object-safe and providers are passed around as [`DynLlmProvider`].

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use agentry_types::llm::{CompletionRequest, LlmError, StreamEvent};

/// Boxed stream of provider events.
pub type LlmEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for LLM provider backends (OpenAI, Anthropic, Ollama, ...).
///
/// Implementations live in agentry-infra.
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "openai", "anthropic", "ollama").
    fn name(&self) -> &str;

    /// Default model used when a request leaves `model` empty.
    fn model(&self) -> &str;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// The stream is `'static` so it can outlive the borrow of the provider
    /// and be driven from inside the engine's response stream.
    fn stream(&self, request: CompletionRequest) -> LlmEventStream;
}

/// Shared, type-erased LLM provider for runtime provider selection.
pub type DynLlmProvider = Arc<dyn LlmProvider>;
