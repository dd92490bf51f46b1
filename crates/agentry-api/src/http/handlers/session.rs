//! Session message history.
//!
//! GET /api/v1/sessions/{session_id}/messages

use std::time::Instant;

use axum::extract::{Path, State};
use uuid::Uuid;

use agentry_core::chat::repository::ChatRepository;
use agentry_types::chat::ChatMessage;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// GET /api/v1/sessions/{session_id}/messages
///
/// Sessions of other accounts are reported as missing.
pub async fn get_messages(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<Vec<ChatMessage>>, AppError> {
    let start = Instant::now();
    let session_id = parse_uuid(&session_id)?;

    let session = state
        .chat
        .get_session(auth.account_id, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let messages = state.chat.list_messages(session.id).await?;
    Ok(ApiResponse::success(messages, start))
}
