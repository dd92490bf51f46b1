//! Builders for `vectorSearch` and `vectorSearchWithReranking`.

use agentry_core::tools::vector_search::{RerankingSearchTool, VectorSearchTool};
use agentry_core::tools::{BoxTool, ToolBuildContext};
use agentry_types::credential::ServiceName;
use agentry_types::error::AgentError;
use agentry_types::tool::{RerankingSearchConfig, ToolSpec, VectorSearchConfig};
use secrecy::SecretString;

use super::BuiltinToolDeps;
use crate::retrieval::{HttpEmbedder, HttpReranker, PineconeIndex};

const PINECONE: &str = "pinecone";

pub async fn build_vector_search(
    spec: ToolSpec,
    ctx: ToolBuildContext,
    deps: BuiltinToolDeps,
) -> Result<BoxTool, AgentError> {
    let config: VectorSearchConfig = spec.parse()?;
    let embedder = embedder(&ctx, &deps)?;
    let index = connect_index(&config.provider, &config.index, &config.namespace, &ctx, &deps).await?;

    tracing::debug!(
        account_id = ctx.account_id,
        index = %config.index,
        namespace = %config.namespace,
        "built vector search tool"
    );
    Ok(BoxTool::new(VectorSearchTool::new(
        config.tool_name(),
        config.tool_description(),
        embedder,
        index,
        config.top_k,
    )))
}

pub async fn build_reranking_search(
    spec: ToolSpec,
    ctx: ToolBuildContext,
    deps: BuiltinToolDeps,
) -> Result<BoxTool, AgentError> {
    let config: RerankingSearchConfig = spec.parse()?;
    let embedder = embedder(&ctx, &deps)?;
    let index = connect_index(&config.provider, &config.index, &config.namespace, &ctx, &deps).await?;

    let reranker = deps
        .config
        .reranker_api_url
        .as_deref()
        .map(|url| HttpReranker::new(deps.http.clone(), url, ctx.auth_token.clone()));
    if reranker.is_none() {
        tracing::warn!(namespace = %config.namespace, "reranker url not configured, tool will fall back to similarity order");
    }

    Ok(BoxTool::new(RerankingSearchTool::new(
        config.tool_name(),
        config.tool_description(),
        embedder,
        index,
        reranker,
        config.top_k,
        config.top_n,
    )))
}

fn embedder(ctx: &ToolBuildContext, deps: &BuiltinToolDeps) -> Result<HttpEmbedder, AgentError> {
    let url = deps
        .config
        .embeddings_api_url
        .as_deref()
        .ok_or_else(|| AgentError::Config("EMBEDDINGS_API_URL is not configured".to_string()))?;
    Ok(HttpEmbedder::new(deps.http.clone(), url, ctx.auth_token.clone()))
}

async fn connect_index(
    provider: &str,
    index: &str,
    namespace: &str,
    ctx: &ToolBuildContext,
    deps: &BuiltinToolDeps,
) -> Result<PineconeIndex, AgentError> {
    if provider != PINECONE {
        return Err(AgentError::Config(format!("Unsupported vector provider: {provider}")));
    }

    let api_key = ctx
        .credentials
        .api_key(ctx.account_id, ServiceName::PineconeApiKey)
        .await?
        .ok_or_else(|| AgentError::Credential("Pinecone API key required".to_string()))?;

    PineconeIndex::connect(
        deps.http.clone(),
        &deps.config.pinecone_control_url,
        SecretString::from(api_key),
        index,
        namespace,
    )
    .await
}
