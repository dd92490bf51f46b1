//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use agentry_types::error::{AgentError, RepositoryError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Agent assembly or access errors.
    Agent(AgentError),
    /// Storage errors outside an agent run.
    Repository(RepositoryError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
    /// Resource missing or owned by another account.
    NotFound(String),
    /// Generic internal error.
    Internal(String),
}

impl From<AgentError> for AppError {
    fn from(e: AgentError) -> Self {
        AppError::Agent(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl AppError {
    /// HTTP status, machine-readable code and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Agent(AgentError::AgentNotFound) => {
                (StatusCode::NOT_FOUND, "AGENT_NOT_FOUND", "Agent not found".to_string())
            }
            AppError::Agent(AgentError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Agent(e @ (AgentError::Config(_) | AgentError::Credential(_))) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "AGENT_CONFIG_ERROR", e.message())
            }
            AppError::Agent(AgentError::ExternalService(msg)) => {
                (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR", msg.clone())
            }
            AppError::Agent(AgentError::Repository(e)) | AppError::Repository(e) => match e {
                RepositoryError::NotFound => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found".to_string())
                }
                RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                other => {
                    tracing::error!(error = %other, "repository failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Storage error".to_string())
                }
            },
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, ApiResponse::error(code, &message)).into_response()
    }
}
