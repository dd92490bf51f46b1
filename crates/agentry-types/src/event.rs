//! External streaming protocol.
//!
//! Every record sent to the client is a JSON object with an `event` name and
//! optional `data`, `toolCalls` and `retrieval_calls` fields.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::tool::ToolCallRecord;

/// Event names of the external protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "on_chain_start")]
    ChainStart,
    #[serde(rename = "on_chain_end")]
    ChainEnd,
    #[serde(rename = "on_chat_model_start")]
    ChatModelStart,
    #[serde(rename = "on_chat_model_stream")]
    ChatModelStream,
    #[serde(rename = "on_chat_model_end")]
    ChatModelEnd,
    #[serde(rename = "on_tool_start")]
    ToolStart,
    #[serde(rename = "on_tool_end")]
    ToolEnd,
    #[serde(rename = "error")]
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::ChainStart => "on_chain_start",
            EventKind::ChainEnd => "on_chain_end",
            EventKind::ChatModelStart => "on_chat_model_start",
            EventKind::ChatModelStream => "on_chat_model_stream",
            EventKind::ChatModelEnd => "on_chat_model_end",
            EventKind::ToolStart => "on_tool_start",
            EventKind::ToolEnd => "on_tool_end",
            EventKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// One record of the external event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(rename = "toolCalls", default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_calls: Option<Vec<serde_json::Value>>,
}

impl StreamRecord {
    pub fn new(event: EventKind) -> Self {
        Self {
            event,
            data: None,
            tool_calls: None,
            retrieval_calls: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<serde_json::Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    pub fn with_retrieval_calls(mut self, retrieval_calls: Vec<serde_json::Value>) -> Self {
        if !retrieval_calls.is_empty() {
            self.retrieval_calls = Some(retrieval_calls);
        }
        self
    }

    /// Terminal error record: `{"event": "error", "data": {"error", "message"}}`.
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Self::new(EventKind::Error).with_data(serde_json::json!({
            "error": kind,
            "message": message.into(),
        }))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.event, EventKind::ChainEnd | EventKind::Error)
    }
}
