//! Tool specification, definition and result types.
//!
//! A [`ToolSpec`] is the declarative entry inside an agent config. It keeps
//! its `type` string and the remaining fields untouched so that unknown tool
//! types survive deserialization and can be skipped by the registry instead of
//! failing the whole config. Each builder parses the fields it needs into one
//! of the typed `*Config` structs below.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

pub const VECTOR_SEARCH: &str = "vectorSearch";
pub const VECTOR_SEARCH_WITH_RERANKING: &str = "vectorSearchWithReranking";
pub const DB_READ: &str = "dbRead";
pub const DB_WRITE: &str = "dbWrite";

/// A declarative tool entry from an agent config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ToolSpec {
    pub fn new(
        tool_type: impl Into<String>,
        params: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            tool_type: tool_type.into(),
            params,
        }
    }

    /// Parse the spec's fields into a typed config.
    ///
    /// Deserialization failures become [`AgentError::Config`].
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, AgentError> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone())).map_err(|e| {
            AgentError::Config(format!("invalid {} tool config: {e}", self.tool_type))
        })
    }
}

/// `vectorSearch` config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchConfig {
    pub provider: String,
    pub index: String,
    pub namespace: String,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_search_top_k")]
    pub top_k: u32,
}

fn default_search_top_k() -> u32 {
    10
}

impl VectorSearchConfig {
    pub fn tool_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("search_{}", self.namespace))
    }

    pub fn tool_description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Search the {} knowledge base", self.namespace))
    }
}

/// `vectorSearchWithReranking` config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankingSearchConfig {
    pub provider: String,
    pub index: String,
    pub namespace: String,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_rerank_top_k")]
    pub top_k: u32,
    #[serde(default = "default_rerank_top_n")]
    pub top_n: u32,
}

fn default_rerank_top_k() -> u32 {
    20
}

fn default_rerank_top_n() -> u32 {
    5
}

impl RerankingSearchConfig {
    pub fn tool_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("search_rerank_{}", self.namespace))
    }

    pub fn tool_description(&self) -> String {
        self.description.clone().unwrap_or_else(|| {
            format!("Search and rerank the {} knowledge base", self.namespace)
        })
    }
}

/// `dbRead` config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbReadConfig {
    pub table: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Narrow the readable columns further than the table whitelist.
    pub columns: Option<Vec<String>>,
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

fn default_max_limit() -> u32 {
    100
}

impl DbReadConfig {
    pub fn tool_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("query_{}", self.table))
    }

    pub fn tool_description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Query rows from the {} table", self.table))
    }
}

/// `dbWrite` config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbWriteConfig {
    pub credential_id: i64,
    pub table: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub required_columns: Vec<String>,
    #[serde(default)]
    pub inject_account_id: bool,
}

impl DbWriteConfig {
    pub fn tool_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("insert_{}", self.table))
    }

    pub fn tool_description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Insert a row into the {} table", self.table))
    }
}

/// Name, description and JSON-schema input contract of a capability, as
/// presented to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Result of a capability invocation.
///
/// Callers branch on the variant, never on the presence of keys in a map.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Payload fields are serialized next to `"status": "success"`.
    Success(serde_json::Map<String, serde_json::Value>),
    Empty { message: String },
    Error { message: String },
}

impl ToolOutput {
    pub fn error(message: impl Into<String>) -> Self {
        ToolOutput::Error {
            message: message.into(),
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        ToolOutput::Empty {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error { .. })
    }

    /// JSON shape handed back to the model and recorded in tool-call records.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            ToolOutput::Success(payload) => {
                let mut map = payload.clone();
                map.insert("status".into(), "success".into());
                serde_json::Value::Object(map)
            }
            ToolOutput::Empty { message } => serde_json::json!({
                "status": "empty",
                "message": message,
            }),
            ToolOutput::Error { message } => serde_json::json!({
                "status": "error",
                "error": message,
            }),
        }
    }
}

/// Tool category shown to clients, derived from the tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolCallType {
    VectorSearch,
    VectorSearchWithReranking,
    DbTableRead,
    DbTableWrite,
    Custom,
}

impl ToolCallType {
    pub fn from_tool_name(name: &str) -> Self {
        if name.starts_with("search_rerank_") {
            ToolCallType::VectorSearchWithReranking
        } else if name.starts_with("search_") {
            ToolCallType::VectorSearch
        } else if name.starts_with("query_") {
            ToolCallType::DbTableRead
        } else if name.starts_with("insert_") || name.starts_with("create_") {
            ToolCallType::DbTableWrite
        } else {
            ToolCallType::Custom
        }
    }
}

impl fmt::Display for ToolCallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolCallType::VectorSearch => write!(f, "vectorSearch"),
            ToolCallType::VectorSearchWithReranking => write!(f, "vectorSearchWithReranking"),
            ToolCallType::DbTableRead => write!(f, "dbTableRead"),
            ToolCallType::DbTableWrite => write!(f, "dbTableWrite"),
            ToolCallType::Custom => write!(f, "custom"),
        }
    }
}

/// A tool invocation as recorded on the assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_type: ToolCallType,
    pub tool_name: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
}
