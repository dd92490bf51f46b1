//! HTTP adapters for the retrieval ports: embedding service, reranking
//! service and Pinecone.
//!
//! All adapters share one `reqwest::Client`. Failures are reported as
//! `AgentError::ExternalService`; response bodies of failed calls are kept
//! in the message, request headers never are.

pub mod embedding;
pub mod pinecone;
pub mod rerank;

use agentry_types::error::AgentError;

pub use embedding::HttpEmbedder;
pub use pinecone::PineconeIndex;
pub use rerank::HttpReranker;

/// Join a configured base URL and an endpoint path.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Turn a non-success response into an `ExternalService` error.
pub(crate) async fn check_status(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AgentError::ExternalService(format!(
        "{service} returned {}: {body}",
        status.as_u16()
    )))
}

pub(crate) fn request_failed(service: &str, err: reqwest::Error) -> AgentError {
    AgentError::ExternalService(format!("{service} request failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("http://embed.local/", "/huggingface/embedding"),
            "http://embed.local/huggingface/embedding"
        );
        assert_eq!(endpoint("http://x", "/a"), "http://x/a");
    }
}
