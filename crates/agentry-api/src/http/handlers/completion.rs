//! SSE completion endpoint.
//!
//! POST /api/v1/agents/{agent_id}/completion
//!
//! Each SSE `data:` line carries one JSON stream record
//! (`{"event": "on_chat_model_stream", "data": ...}`). Failures inside the
//! run arrive as an `error` record on an otherwise successful response.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use agentry_core::agent::engine::CompletionInput;

use crate::http::extractors::auth::Authenticated;
use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequestBody {
    /// Client-chosen conversation UUID; created on first use.
    pub session_id: String,
    pub prompt: String,
}

/// POST /api/v1/agents/{agent_id}/completion
pub async fn stream_completion(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(agent_id): Path<i64>,
    Json(body): Json<CompletionRequestBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(agent_id, account_id = auth.account_id, "completion requested");

    let records = state.engine.stream_completion(CompletionInput {
        account_id: auth.account_id,
        agent_id,
        session_id: body.session_id,
        prompt: body.prompt,
        auth_token: Some(auth.token),
    });

    let events = records.map(|record| {
        let event = Event::default().json_data(&record).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode stream record");
            Event::default().data(r#"{"event":"error","data":{"error":"serialization_error"}}"#)
        });
        Ok::<_, Infallible>(event)
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
