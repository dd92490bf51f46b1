//! Credential resolution service.
//!
//! `CredentialService` combines the credential repository with the vault
//! cipher: it looks up a stored credential scoped to an account and returns
//! it decrypted. Decryption happens on every lookup; plaintext is never
//! cached or logged.

use std::sync::Arc;

use agentry_types::credential::{Credential, ResolvedCredential, ServiceName};
use agentry_types::error::AgentError;

use crate::repository::credential::{DynCredentialRepository, SecretCipher};

/// Field holding the secret of an API-key credential.
pub const API_KEY_FIELD: &str = "api_key";

/// Field holding the secret of a database credential.
pub const CONNECTION_STRING_FIELD: &str = "connection_string";

pub struct CredentialService {
    repo: DynCredentialRepository,
    cipher: Arc<dyn SecretCipher>,
}

impl CredentialService {
    pub fn new(repo: DynCredentialRepository, cipher: Arc<dyn SecretCipher>) -> Self {
        Self { repo, cipher }
    }

    /// Decrypted credential for `(account_id, service_name)`, or `None`.
    ///
    /// A credential that exists but cannot be decrypted with any configured
    /// key is a `Credential` error.
    pub async fn get_credential(
        &self,
        account_id: i64,
        service_name: &str,
    ) -> Result<Option<ResolvedCredential>, AgentError> {
        let stored = self.repo.get_by_service_boxed(account_id, service_name).await?;
        stored.map(|c| self.resolve(c)).transpose()
    }

    /// Decrypted credential by id, or `None` when it is missing or owned by
    /// another account.
    pub async fn get_credential_by_id(
        &self,
        account_id: i64,
        credential_id: i64,
    ) -> Result<Option<ResolvedCredential>, AgentError> {
        let stored = self.repo.get_by_id_boxed(account_id, credential_id).await?;
        stored.map(|c| self.resolve(c)).transpose()
    }

    /// The API key stored for a well-known service, if any.
    pub async fn api_key(
        &self,
        account_id: i64,
        service: ServiceName,
    ) -> Result<Option<String>, AgentError> {
        let Some(credential) = self.get_credential(account_id, service.as_str()).await? else {
            return Ok(None);
        };
        get_value(&credential, API_KEY_FIELD).map(|v| Some(v.to_string()))
    }

    fn resolve(&self, credential: Credential) -> Result<ResolvedCredential, AgentError> {
        let plaintext = self.cipher.decrypt(&credential.encrypted_data).map_err(|e| {
            tracing::warn!(
                credential_id = credential.id,
                service = %credential.service_name,
                "credential could not be decrypted"
            );
            AgentError::Credential(format!(
                "Failed to decrypt credential {}: {e}",
                credential.service_name
            ))
        })?;

        let serde_json::Value::Object(secret) = plaintext else {
            return Err(AgentError::Credential(format!(
                "Credential {} is not a JSON object",
                credential.service_name
            )));
        };

        Ok(ResolvedCredential {
            id: credential.id,
            service_name: credential.service_name,
            credential_type: credential.credential_type,
            secret,
            metadata: credential.metadata,
        })
    }
}

/// A string field of a decrypted credential.
pub fn get_value<'a>(credential: &'a ResolvedCredential, field: &str) -> Result<&'a str, AgentError> {
    credential
        .secret
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            AgentError::Credential(format!(
                "Credential {} has no '{field}' value",
                credential.service_name
            ))
        })
}
