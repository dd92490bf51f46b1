//! Reranking service client.

use agentry_core::tools::retrieval::{RerankScore, Reranker};
use agentry_types::error::AgentError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{check_status, endpoint, request_failed};

const SERVICE: &str = "Reranker API";

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankScore>,
}

/// `POST {base}/huggingface/rerank` with `{"query", "documents"}`.
pub struct HttpReranker {
    client: reqwest::Client,
    url: String,
    auth_token: Option<SecretString>,
}

impl HttpReranker {
    pub fn new(client: reqwest::Client, base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client,
            url: endpoint(base_url, "/huggingface/rerank"),
            auth_token: auth_token.map(SecretString::from),
        }
    }
}

impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankScore>, AgentError> {
        let mut request = self.client.post(&self.url).json(&serde_json::json!({
            "query": query,
            "documents": documents,
        }));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| request_failed(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ExternalService(format!("{SERVICE} response: {e}")))?;

        // Scores pointing past the input would index out of bounds later.
        let (valid, dropped): (Vec<_>, Vec<_>) = body
            .results
            .into_iter()
            .partition(|score| score.index < documents.len());
        if !dropped.is_empty() {
            tracing::warn!(dropped = dropped.len(), "reranker returned out-of-range indices");
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_rerank_parses_scores_and_drops_bad_indices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/huggingface/rerank"))
            .and(body_json(json!({"query": "q", "documents": ["a", "b"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"index": 1, "relevance_score": 0.9},
                    {"index": 0, "relevance_score": 0.2},
                    {"index": 7, "relevance_score": 0.1}
                ]
            })))
            .mount(&server)
            .await;

        let reranker = HttpReranker::new(reqwest::Client::new(), &server.uri(), None);
        let scores = reranker
            .rerank("q", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(
            scores,
            vec![
                RerankScore { index: 1, relevance_score: 0.9 },
                RerankScore { index: 0, relevance_score: 0.2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_rerank_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let reranker = HttpReranker::new(reqwest::Client::new(), &server.uri(), Some("t".into()));
        let err = reranker.rerank("q", &["a".to_string()]).await.unwrap_err();
        assert_eq!(err.message(), "Reranker API returned 503: warming up");
    }
}
