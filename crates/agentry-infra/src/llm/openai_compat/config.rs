//! Connection settings for OpenAI-compatible endpoints.

use secrecy::SecretString;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Ollama ignores the key, but the client always sends one.
const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

/// Configuration for one OpenAI-compatible provider.
pub struct OpenAiCompatConfig {
    /// Provider name reported by [`LlmProvider::name`](agentry_core::llm::provider::LlmProvider::name).
    pub provider_name: String,
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
}

pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: OPENAI_BASE_URL.into(),
        api_key,
        model: model.into(),
    }
}

/// Ollama serves the OpenAI protocol under `/v1`.
pub fn ollama_defaults(ollama_base_url: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "ollama".into(),
        base_url: format!("{}/v1", ollama_base_url.trim_end_matches('/')),
        api_key: SecretString::from(OLLAMA_PLACEHOLDER_KEY),
        model: model.into(),
    }
}
