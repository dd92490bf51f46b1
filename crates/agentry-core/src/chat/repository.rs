//! ChatRepository trait definition.
//!
//! Sessions are addressed by their external UUID and always scoped to an
//! account. Messages are append-only. Follows the same RPITIT pattern as
//! the other repository traits.

use agentry_types::chat::{ChatMessage, ChatSession, StoredMessage};
use agentry_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chat session and message persistence.
///
/// Implementations live in agentry-infra (e.g., `SqliteChatRepository`).
pub trait ChatRepository: Send + Sync {
    /// Get a session by external id, only if it belongs to `account_id`.
    fn get_session(
        &self,
        account_id: i64,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// Create a session with the given external id.
    fn create_session(
        &self,
        account_id: i64,
        agent_id: Option<i64>,
        session_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;

    /// Append a message to a session (internal id).
    fn append_message(
        &self,
        session_id: i64,
        message: &StoredMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// All messages of a session (internal id), ascending by creation time.
    fn list_messages(
        &self,
        session_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}
