use thiserror::Error;

/// Errors from repository operations (used by trait definitions in agentry-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors raised while assembling or running an agent.
///
/// The variants decide how far a failure reaches: a `Config` or `Credential`
/// error from a tool builder drops only that tool, while the same error from
/// model resolution aborts the whole request before streaming begins.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Unsupported or contradictory tool/model specification.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required secret is missing or could not be decrypted.
    #[error("credential error: {0}")]
    Credential(String),

    /// Embedding, rerank, vector index or model provider failure.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Malformed caller input (bad session id, schema mismatch).
    #[error("validation error: {0}")]
    Validation(String),

    /// The agent does not exist or the caller may not use it.
    #[error("Agent not found")]
    AgentNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AgentError {
    /// Short machine-readable kind, used as the `error` field of error records.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Config(_) => "config_error",
            AgentError::Credential(_) => "credential_error",
            AgentError::ExternalService(_) => "external_service_error",
            AgentError::Validation(_) => "validation_error",
            AgentError::AgentNotFound => "agent_not_found",
            AgentError::Repository(_) => "repository_error",
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            AgentError::Config(msg)
            | AgentError::Credential(msg)
            | AgentError::ExternalService(msg)
            | AgentError::Validation(msg) => msg.clone(),
            AgentError::AgentNotFound => "Agent not found".to_string(),
            AgentError::Repository(err) => err.to_string(),
        }
    }
}

/// Errors from the credential vault.
///
/// Messages never include key material or plaintext.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no encryption key configured")]
    MissingKey,

    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed with all configured keys")]
    Decrypt,

    #[error("malformed ciphertext: {0}")]
    Malformed(String),
}

impl From<VaultError> for AgentError {
    fn from(err: VaultError) -> Self {
        AgentError::Credential(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_agent_error_kind_and_message() {
        let err = AgentError::Credential("Openai API key required".to_string());
        assert_eq!(err.kind(), "credential_error");
        assert_eq!(err.message(), "Openai API key required");
        assert_eq!(err.to_string(), "credential error: Openai API key required");
    }

    #[test]
    fn test_repository_error_converts() {
        let err: AgentError = RepositoryError::NotFound.into();
        assert_eq!(err.kind(), "repository_error");
        assert_eq!(err.message(), "entity not found");
    }
}
