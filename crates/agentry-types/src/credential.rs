//! Credential types.
//!
//! A credential is an account-scoped secret keyed by `(account_id, service_name)`.
//! The secret itself is a JSON object that is encrypted at rest; only the
//! `credential_type` discriminator and non-sensitive metadata are stored in
//! clear text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Well-known service names for provider API keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceName {
    #[serde(rename = "OPENAI_API_KEY")]
    OpenAiApiKey,
    #[serde(rename = "ANTHROPIC_API_KEY")]
    AnthropicApiKey,
    #[serde(rename = "PINECONE_API_KEY")]
    PineconeApiKey,
    #[serde(rename = "SUPABASE")]
    Supabase,
    #[serde(rename = "ELEVENLABS_API_KEY")]
    ElevenLabsApiKey,
}

impl ServiceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::OpenAiApiKey => "OPENAI_API_KEY",
            ServiceName::AnthropicApiKey => "ANTHROPIC_API_KEY",
            ServiceName::PineconeApiKey => "PINECONE_API_KEY",
            ServiceName::Supabase => "SUPABASE",
            ServiceName::ElevenLabsApiKey => "ELEVENLABS_API_KEY",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPENAI_API_KEY" => Ok(ServiceName::OpenAiApiKey),
            "ANTHROPIC_API_KEY" => Ok(ServiceName::AnthropicApiKey),
            "PINECONE_API_KEY" => Ok(ServiceName::PineconeApiKey),
            "SUPABASE" => Ok(ServiceName::Supabase),
            "ELEVENLABS_API_KEY" => Ok(ServiceName::ElevenLabsApiKey),
            other => Err(format!("unknown service name: '{other}'")),
        }
    }
}

/// Discriminator for the shape of the decrypted secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// `{"api_key": "..."}`
    ApiKey,
    /// `{"connection_string": "..."}`
    DbConnection,
    /// Any other structured secret.
    Other(String),
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialType::ApiKey => write!(f, "api_key"),
            CredentialType::DbConnection => write!(f, "db_connection"),
            CredentialType::Other(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for CredentialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api_key" => Ok(CredentialType::ApiKey),
            "db_connection" => Ok(CredentialType::DbConnection),
            "" => Err("empty credential type".to_string()),
            other => Ok(CredentialType::Other(other.to_string())),
        }
    }
}

/// A stored credential row. `encrypted_data` is vault ciphertext.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: i64,
    pub account_id: i64,
    pub service_name: String,
    pub credential_type: CredentialType,
    pub encrypted_data: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A decrypted credential. Does not implement `Debug` so the secret
/// cannot end up in logs by accident.
#[derive(Clone)]
pub struct ResolvedCredential {
    pub id: i64,
    pub service_name: String,
    pub credential_type: CredentialType,
    pub secret: serde_json::Map<String, serde_json::Value>,
    pub metadata: serde_json::Value,
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("id", &self.id)
            .field("service_name", &self.service_name)
            .field("credential_type", &self.credential_type)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
