//! Vector search tools, with and without a reranking pass.
//!
//! Both tools are generic over the retrieval ports so they can be exercised
//! without any network service.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use agentry_types::tool::{ToolDefinition, ToolOutput};

use super::Tool;
use super::retrieval::{Embedder, Reranker, VectorIndex, VectorMatch};
use super::schema::input_schema;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VectorSearchInput {
    /// Natural-language search query.
    pub query: String,
    /// Number of nearest neighbours to return.
    pub top_k: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RerankingSearchInput {
    /// Natural-language search query.
    pub query: String,
    /// Number of candidates to retrieve before reranking.
    pub top_k: Option<u32>,
    /// Number of results to keep after reranking.
    pub top_n: Option<u32>,
}

fn match_to_value(m: &VectorMatch) -> Value {
    json!({"id": m.id, "score": m.score, "metadata": m.metadata})
}

async fn retrieve<E: Embedder, V: VectorIndex>(
    embedder: &E,
    index: &V,
    query: &str,
    top_k: u32,
) -> Result<Vec<VectorMatch>, ToolOutput> {
    let vector = embedder.embed(query).await.map_err(|e| {
        tracing::warn!(namespace = index.namespace(), error = %e, "embedding failed");
        ToolOutput::error(format!("Embedding failed: {}", e.message()))
    })?;

    index.query(vector, top_k).await.map_err(|e| {
        tracing::warn!(
            index = index.index_name(),
            namespace = index.namespace(),
            error = %e,
            "vector query failed"
        );
        ToolOutput::error(format!("Vector search failed: {}", e.message()))
    })
}

/// `vectorSearch`: embed the query and return the nearest neighbours.
pub struct VectorSearchTool<E, V> {
    definition: ToolDefinition,
    embedder: E,
    index: V,
    default_top_k: u32,
}

impl<E: Embedder, V: VectorIndex> VectorSearchTool<E, V> {
    pub fn new(name: String, description: String, embedder: E, index: V, default_top_k: u32) -> Self {
        Self {
            definition: ToolDefinition {
                name,
                description,
                input_schema: input_schema::<VectorSearchInput>(),
            },
            embedder,
            index,
            default_top_k,
        }
    }
}

impl<E: Embedder, V: VectorIndex> Tool for VectorSearchTool<E, V> {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, input: Value) -> ToolOutput {
        let input: VectorSearchInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };
        let top_k = input.top_k.unwrap_or(self.default_top_k);

        let matches = match retrieve(&self.embedder, &self.index, &input.query, top_k).await {
            Ok(matches) => matches,
            Err(output) => return output,
        };
        if matches.is_empty() {
            return ToolOutput::empty(format!(
                "No results found in namespace {}",
                self.index.namespace()
            ));
        }

        let mut payload = Map::new();
        payload.insert(
            "results".into(),
            Value::Array(matches.iter().map(match_to_value).collect()),
        );
        payload.insert("namespace".into(), self.index.namespace().into());
        payload.insert("index".into(), self.index.index_name().into());
        ToolOutput::Success(payload)
    }
}

/// `vectorSearchWithReranking`: retrieve `top_k` candidates, rerank them and
/// keep the best `top_n`.
///
/// Without a reranker, or when reranking fails, the first `top_n`
/// candidates in similarity order are returned with
/// `reranking_applied = false`.
pub struct RerankingSearchTool<E, V, R> {
    definition: ToolDefinition,
    embedder: E,
    index: V,
    reranker: Option<R>,
    default_top_k: u32,
    default_top_n: u32,
}

impl<E: Embedder, V: VectorIndex, R: Reranker> RerankingSearchTool<E, V, R> {
    pub fn new(
        name: String,
        description: String,
        embedder: E,
        index: V,
        reranker: Option<R>,
        default_top_k: u32,
        default_top_n: u32,
    ) -> Self {
        Self {
            definition: ToolDefinition {
                name,
                description,
                input_schema: input_schema::<RerankingSearchInput>(),
            },
            embedder,
            index,
            reranker,
            default_top_k,
            default_top_n,
        }
    }

    fn payload(&self, query: &str, results: Vec<Value>, applied: bool, message: String) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("final_results".into(), results.len().into());
        payload.insert("results".into(), Value::Array(results));
        payload.insert("namespace".into(), self.index.namespace().into());
        payload.insert("index".into(), self.index.index_name().into());
        payload.insert("query".into(), query.into());
        payload.insert("reranking_applied".into(), applied.into());
        payload.insert("message".into(), message.into());
        payload
    }

    fn similarity_fallback(
        &self,
        query: &str,
        candidates: &[VectorMatch],
        top_n: usize,
        message: String,
    ) -> ToolOutput {
        let results = candidates.iter().take(top_n).map(match_to_value).collect();
        let mut payload = self.payload(query, results, false, message);
        payload.insert("initial_candidates".into(), candidates.len().into());
        ToolOutput::Success(payload)
    }
}

impl<E: Embedder, V: VectorIndex, R: Reranker> Tool for RerankingSearchTool<E, V, R> {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, input: Value) -> ToolOutput {
        let input: RerankingSearchInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };
        let top_k = input.top_k.unwrap_or(self.default_top_k);
        let top_n = input.top_n.unwrap_or(self.default_top_n) as usize;

        let candidates = match retrieve(&self.embedder, &self.index, &input.query, top_k).await {
            Ok(candidates) => candidates,
            Err(output) => return output,
        };
        if candidates.is_empty() {
            return ToolOutput::empty(format!(
                "No results found in namespace {}",
                self.index.namespace()
            ));
        }

        let Some(reranker) = &self.reranker else {
            return self.similarity_fallback(
                &input.query,
                &candidates,
                top_n,
                "Reranker not configured, using similarity search only".to_string(),
            );
        };

        let documents: Vec<String> = candidates.iter().map(|m| m.content().to_string()).collect();
        let mut scores = match reranker.rerank(&input.query, &documents).await {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!(namespace = self.index.namespace(), error = %e, "reranking failed, falling back");
                return self.similarity_fallback(
                    &input.query,
                    &candidates,
                    top_n,
                    format!("Reranking failed: {}", e.message()),
                );
            }
        };

        scores.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        let results: Vec<Value> = scores
            .iter()
            .filter_map(|s| candidates.get(s.index).map(|m| (s, m)))
            .take(top_n)
            .map(|(s, m)| {
                json!({
                    "id": m.id,
                    "score": s.relevance_score,
                    "similarity_score": m.score,
                    "metadata": m.metadata,
                })
            })
            .collect();

        let message = format!(
            "Reranked {} candidates, returning top {}",
            candidates.len(),
            results.len()
        );
        let mut payload = self.payload(&input.query, results, true, message);
        payload.insert("initial_candidates".into(), candidates.len().into());
        ToolOutput::Success(payload)
    }
}
