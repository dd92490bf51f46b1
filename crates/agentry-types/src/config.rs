//! Application configuration types.
//!
//! `AppConfig` represents `agentry.toml`. Every field has a default so a
//! missing or partial file still yields a usable configuration. Vault keys are
//! deliberately absent: they are only read from the environment.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite URL of the application store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Base URL of the embedding service (`/huggingface/embedding` is appended).
    #[serde(default)]
    pub embeddings_api_url: Option<String>,

    /// Base URL of the reranking service (`/huggingface/rerank` is appended).
    #[serde(default)]
    pub reranker_api_url: Option<String>,

    /// Pinecone control-plane URL used to resolve index hosts.
    #[serde(default = "default_pinecone_control_url")]
    pub pinecone_control_url: String,

    /// Base URL of a local Ollama server.
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Upper bound on model turns per run when tools are attached.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Output token ceiling per model turn.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_database_url() -> String {
    "sqlite://agentry.db?mode=rwc".to_string()
}

fn default_pinecone_control_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_max_iterations() -> u32 {
    10
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            embeddings_api_url: None,
            reranker_api_url: None,
            pinecone_control_url: default_pinecone_control_url(),
            ollama_base_url: default_ollama_base_url(),
            max_iterations: default_max_iterations(),
            max_tokens: default_max_tokens(),
        }
    }
}
