//! LLM provider implementations and the [`ModelFactory`] that picks one.
//!
//! OpenAI and Ollama go through the OpenAI-compatible provider; Anthropic
//! has its own SSE client.

pub mod anthropic;
pub mod openai_compat;

use std::sync::Arc;

use secrecy::SecretString;

use agentry_core::llm::factory::{ModelFactory, ModelProviderKind, ResolvedModel, provider_api_key};
use agentry_core::llm::provider::DynLlmProvider;
use agentry_core::service::credential::CredentialService;
use agentry_types::agent::ModelSpec;
use agentry_types::error::AgentError;

use self::anthropic::AnthropicProvider;
use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::{ollama_defaults, openai_defaults};

/// Resolves model specs against the account's stored provider keys.
#[derive(Clone)]
pub struct ProviderModelFactory {
    http: reqwest::Client,
    ollama_base_url: String,
}

impl ProviderModelFactory {
    pub fn new(http: reqwest::Client, ollama_base_url: impl Into<String>) -> Self {
        Self {
            http,
            ollama_base_url: ollama_base_url.into(),
        }
    }

    fn build(&self, kind: ModelProviderKind, api_key: Option<String>, model: &str) -> Result<DynLlmProvider, AgentError> {
        let provider: DynLlmProvider = match (kind, api_key) {
            (ModelProviderKind::OpenAi, Some(key)) => Arc::new(OpenAiCompatibleProvider::new(openai_defaults(
                SecretString::from(key),
                model,
            ))),
            (ModelProviderKind::Anthropic, Some(key)) => Arc::new(AnthropicProvider::new(
                self.http.clone(),
                SecretString::from(key),
                model,
            )),
            (ModelProviderKind::Ollama, _) => Arc::new(OpenAiCompatibleProvider::new(ollama_defaults(
                &self.ollama_base_url,
                model,
            ))),
            (kind, None) => return Err(kind.missing_key_error()),
        };
        Ok(provider)
    }
}

impl ModelFactory for ProviderModelFactory {
    async fn resolve(
        &self,
        spec: &ModelSpec,
        account_id: i64,
        credentials: &CredentialService,
    ) -> Result<ResolvedModel, AgentError> {
        let kind: ModelProviderKind = spec.provider.parse()?;
        let api_key = provider_api_key(kind, account_id, credentials).await?;
        let provider = self.build(kind, api_key, &spec.model)?;

        tracing::debug!(account_id, provider = %kind, model = %spec.model, "resolved model");
        Ok(ResolvedModel {
            provider,
            kind,
            model: spec.model.clone(),
        })
    }
}
