//! Retrieval ports used by the vector search tools.
//!
//! Implementations (HTTP embedding service, Pinecone, HTTP reranker) live in
//! agentry-infra. Errors are `AgentError::ExternalService`.

use std::future::Future;

use agentry_types::error::AgentError;
use serde::{Deserialize, Serialize};

/// Turns query text into an embedding vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, AgentError>> + Send;
}

/// Nearest-neighbour search over one index namespace.
pub trait VectorIndex: Send + Sync {
    fn index_name(&self) -> &str;

    fn namespace(&self) -> &str;

    fn query(
        &self,
        vector: Vec<f32>,
        top_k: u32,
    ) -> impl Future<Output = Result<Vec<VectorMatch>, AgentError>> + Send;
}

/// Scores documents against a query.
pub trait Reranker: Send + Sync {
    fn rerank(
        &self,
        query: &str,
        documents: &[String],
    ) -> impl Future<Output = Result<Vec<RerankScore>, AgentError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl VectorMatch {
    /// Text used when reranking this match.
    pub fn content(&self) -> &str {
        self.metadata
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or("No content available")
    }
}

/// Relevance of the document at `index` in the reranked input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankScore {
    pub index: usize,
    pub relevance_score: f32,
}
