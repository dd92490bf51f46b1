//! Embedding service client.

use agentry_core::tools::retrieval::Embedder;
use agentry_types::error::AgentError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{check_status, endpoint, request_failed};

const SERVICE: &str = "Embedding API";

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// `POST {base}/huggingface/embedding` with `{"input": text}`.
///
/// The caller's bearer token, when present, is forwarded as-is.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    auth_token: Option<SecretString>,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client,
            url: endpoint(base_url, "/huggingface/embedding"),
            auth_token: auth_token.map(SecretString::from),
        }
    }
}

impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "input": text }));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| request_failed(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ExternalService(format!("{SERVICE} response: {e}")))?;

        tracing::debug!(dimension = body.embedding.len(), "embedding generated");
        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_forwards_token_and_parses_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/huggingface/embedding"))
            .and(header("authorization", "Bearer caller-token"))
            .and(body_json(json!({"input": "what is rust"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.5, -1.0, 2.0]})))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(
            reqwest::Client::new(),
            &format!("{}/", server.uri()),
            Some("caller-token".to_string()),
        );
        let vector = embedder.embed("what is rust").await.unwrap();
        assert_eq!(vector, vec![0.5, -1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_embed_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(reqwest::Client::new(), &server.uri(), None);
        let err = embedder.embed("q").await.unwrap_err();
        assert_eq!(err.kind(), "external_service_error");
        assert_eq!(err.message(), "Embedding API returned 401: bad token");
    }
}
