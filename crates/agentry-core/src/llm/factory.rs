//! Model factory port.
//!
//! Resolves a declarative [`ModelSpec`] into a live provider client.
//! Provider names are parsed here so an unsupported provider fails with a
//! `Config` error before any credential lookup or network call.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use agentry_types::agent::ModelSpec;
use agentry_types::credential::ServiceName;
use agentry_types::error::AgentError;

use super::provider::DynLlmProvider;
use crate::service::credential::CredentialService;

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProviderKind {
    OpenAi,
    Anthropic,
    /// Self-hosted, needs no credential.
    Ollama,
}

impl ModelProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProviderKind::OpenAi => "openai",
            ModelProviderKind::Anthropic => "anthropic",
            ModelProviderKind::Ollama => "ollama",
        }
    }

    /// Credential service required by this provider, if any.
    pub fn credential_service(&self) -> Option<ServiceName> {
        match self {
            ModelProviderKind::OpenAi => Some(ServiceName::OpenAiApiKey),
            ModelProviderKind::Anthropic => Some(ServiceName::AnthropicApiKey),
            ModelProviderKind::Ollama => None,
        }
    }

    /// Error reported when the provider's API key is not stored.
    pub fn missing_key_error(&self) -> AgentError {
        let name = self.as_str();
        let mut chars = name.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        AgentError::Credential(format!("{capitalized} API key required"))
    }
}

impl fmt::Display for ModelProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ModelProviderKind::OpenAi),
            "anthropic" => Ok(ModelProviderKind::Anthropic),
            "ollama" => Ok(ModelProviderKind::Ollama),
            _ => Err(AgentError::Config(format!("Unsupported LLM provider: {s}"))),
        }
    }
}

/// A provider client ready to stream completions.
#[derive(Clone)]
pub struct ResolvedModel {
    pub provider: DynLlmProvider,
    pub kind: ModelProviderKind,
    pub model: String,
}

impl fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .finish()
    }
}

/// Turns a model spec into a provider client. Implemented in agentry-infra.
pub trait ModelFactory: Send + Sync {
    fn resolve(
        &self,
        spec: &ModelSpec,
        account_id: i64,
        credentials: &CredentialService,
    ) -> impl Future<Output = Result<ResolvedModel, AgentError>> + Send;
}

/// API key for `kind`, or the `Credential` error telling the caller to add one.
///
/// Returns `Ok(None)` for providers that need no credential.
pub async fn provider_api_key(
    kind: ModelProviderKind,
    account_id: i64,
    credentials: &CredentialService,
) -> Result<Option<String>, AgentError> {
    let Some(service) = kind.credential_service() else {
        return Ok(None);
    };
    match credentials.api_key(account_id, service).await? {
        Some(key) => Ok(Some(key)),
        None => Err(kind.missing_key_error()),
    }
}
