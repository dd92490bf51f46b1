//! Chat session and message types.
//!
//! Sessions have an internal integer id and a stable external UUID that
//! callers use. Messages are append-only and ordered by creation time; the
//! message body is stored as a JSON document (`{role, content, toolCalls?}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::tool::ToolCallRecord;

/// Author of a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Human,
    Ai,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::Human => write!(f, "human"),
            ChatRole::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(ChatRole::Human),
            "ai" => Ok(ChatRole::Ai),
            other => Err(format!("invalid chat role: '{other}'")),
        }
    }
}

/// A conversation owned by one account, optionally bound to one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub session_id: Uuid,
    pub account_id: i64,
    pub agent_id: Option<i64>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Message body as persisted in the `message` JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(
        rename = "toolCalls",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_calls: Option<Vec<ToolCallRecord>>,
}

impl StoredMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            content: content.into(),
            tool_calls: None,
        }
    }

    /// An assistant message. An empty tool-call list is stored as absent.
    pub fn ai(content: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        }
    }
}

/// A persisted message row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub message: StoredMessage,
    pub created_at: DateTime<Utc>,
}
