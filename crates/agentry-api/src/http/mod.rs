//! HTTP API layer for Agentry.
//!
//! Axum routes under `/api/v1/` with API key authentication, an SSE
//! completion stream and an envelope format for JSON responses.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
