//! Anthropic Claude provider with SSE streaming and tool use.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::AnthropicProvider;
