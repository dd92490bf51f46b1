//! API key authentication extractor.
//!
//! Accepts the key from either header:
//! - `Authorization: Bearer <key>`
//! - `X-API-Key: <key>`
//!
//! Keys are SHA-256 hashed and looked up in `api_keys`, which yields the
//! calling account.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::state::AppState;

/// An authenticated caller.
///
/// `token` is the raw key; the completion route forwards it to the
/// embedding and rerank services. Never log it.
pub struct Authenticated {
    pub account_id: i64,
    pub token: String,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_api_key(&parts.headers)?;

        match state.api_keys.authenticate(&token).await? {
            Some(account_id) => {
                tracing::debug!(account_id, "authenticated request");
                Ok(Authenticated { account_id, token })
            }
            None => Err(AppError::Unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
            )),
        }
    }
}

fn extract_api_key(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(auth) = headers.get("authorization") {
        let auth_str = auth
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding".to_string()))?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
    }

    if let Some(key) = headers.get("x-api-key") {
        let key_str = key
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-API-Key header encoding".to_string()))?;
        let key_str = key_str.trim();
        if !key_str.is_empty() {
            return Ok(key_str.to_string());
        }
    }

    Err(AppError::Unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
    ))
}
