//! Agent and versioned agent configuration types.
//!
//! Agent configs are stored as `{schema, version, data}` documents that have
//! already been validated against the JSON schema by the caller. Three
//! versions exist:
//!
//! - v1: `systemPrompt` plus a list of `knowledgeBases`
//! - v2: `systemPrompt` plus a list of typed `tools`
//! - v3: v2 plus an optional `model` selection
//!
//! [`AgentConfig::tool_specs`] and [`AgentConfig::model_spec`] hide the
//! version differences from the orchestration code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolSpec;

/// Schema name every agent config document carries.
pub const AGENT_CONFIG_SCHEMA: &str = "agent_config";

/// Default `topK` given to vector-search tools upgraded from v1 knowledge bases.
pub const V1_KNOWLEDGE_BASE_TOP_K: u32 = 10;

/// Default provider for configs that predate model selection.
pub const DEFAULT_MODEL_PROVIDER: &str = "openai";

/// Default model for configs that predate model selection.
pub const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";

/// System prompt used when a config has no `systemPrompt` field.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A stored agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub config: AgentConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Versioned agent configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub schema: String,
    pub version: u32,
    #[serde(default)]
    pub data: AgentConfigData,
}

/// Payload of an agent config. Which fields are honoured depends on the
/// document version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfigData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge_bases: Vec<KnowledgeBase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSpec>,
}

/// A v1 knowledge base reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub provider: String,
    pub index: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl KnowledgeBase {
    /// Upgrade to a `vectorSearch` tool spec.
    pub fn to_tool_spec(&self) -> ToolSpec {
        let mut params = serde_json::Map::new();
        params.insert("provider".into(), self.provider.clone().into());
        params.insert("index".into(), self.index.clone().into());
        params.insert("namespace".into(), self.namespace.clone().into());
        if let Some(description) = &self.description {
            params.insert("description".into(), description.clone().into());
        }
        params.insert("topK".into(), V1_KNOWLEDGE_BASE_TOP_K.into());
        ToolSpec::new(crate::tool::VECTOR_SEARCH, params)
    }
}

/// Declarative model selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_provider() -> String {
    DEFAULT_MODEL_PROVIDER.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
        }
    }
}

impl AgentConfig {
    /// The raw system prompt, before template variables are resolved.
    pub fn system_prompt(&self) -> &str {
        self.data.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Tool specs for this config, with v1 knowledge bases upgraded to
    /// `vectorSearch` specs.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        if self.version <= 1 {
            self.data
                .knowledge_bases
                .iter()
                .map(KnowledgeBase::to_tool_spec)
                .collect()
        } else {
            self.data.tools.clone()
        }
    }

    /// Model selection; configs before v3 always use the default model.
    pub fn model_spec(&self) -> ModelSpec {
        if self.version >= 3 {
            self.data.model.clone().unwrap_or_default()
        } else {
            ModelSpec::default()
        }
    }

    /// Convert a v1 document to v2. Other versions are returned unchanged.
    pub fn migrate_v1_to_v2(&self) -> AgentConfig {
        if self.version != 1 {
            return self.clone();
        }
        AgentConfig {
            schema: self.schema.clone(),
            version: 2,
            data: AgentConfigData {
                system_prompt: self.data.system_prompt.clone(),
                knowledge_bases: Vec::new(),
                tools: self.tool_specs(),
                model: None,
            },
        }
    }
}
