//! Pinecone index client.
//!
//! The data-plane host of an index is looked up once, when the tool is
//! built, through the control plane's describe-index call. Queries then go
//! straight to that host.

use agentry_core::tools::retrieval::{VectorIndex, VectorMatch};
use agentry_types::error::AgentError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{check_status, endpoint, request_failed};

const SERVICE: &str = "Pinecone";
const API_VERSION: &str = "2024-07";

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

/// One namespace of one Pinecone index.
pub struct PineconeIndex {
    client: reqwest::Client,
    query_url: String,
    api_key: SecretString,
    index: String,
    namespace: String,
}

impl PineconeIndex {
    /// Resolve the index host through the control plane.
    pub async fn connect(
        client: reqwest::Client,
        control_url: &str,
        api_key: SecretString,
        index: &str,
        namespace: &str,
    ) -> Result<Self, AgentError> {
        let response = client
            .get(endpoint(control_url, &format!("/indexes/{index}")))
            .header("Api-Key", api_key.expose_secret())
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let described: DescribeIndexResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ExternalService(format!("{SERVICE} describe index: {e}")))?;

        let host = if described.host.starts_with("http://") || described.host.starts_with("https://") {
            described.host
        } else {
            format!("https://{}", described.host)
        };
        tracing::debug!(index, namespace, %host, "resolved pinecone index host");

        Ok(Self {
            client,
            query_url: endpoint(&host, "/query"),
            api_key,
            index: index.to_string(),
            namespace: namespace.to_string(),
        })
    }
}

impl VectorIndex for PineconeIndex {
    fn index_name(&self) -> &str {
        &self.index
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn query(&self, vector: Vec<f32>, top_k: u32) -> Result<Vec<VectorMatch>, AgentError> {
        let response = self
            .client
            .post(&self.query_url)
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&serde_json::json!({
                "vector": vector,
                "topK": top_k,
                "namespace": self.namespace,
                "includeMetadata": true,
                "includeValues": false,
            }))
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ExternalService(format!("{SERVICE} query response: {e}")))?;

        tracing::debug!(index = %self.index, namespace = %self.namespace, matches = body.matches.len(), "pinecone query complete");
        Ok(body.matches)
    }
}
