//! SQLite chat repository implementation.
//!
//! Sessions carry their external UUID as TEXT; message bodies are stored as
//! JSON documents in `chat_messages.message`. Reads go to the reader pool,
//! inserts to the single writer.

use agentry_core::chat::repository::ChatRepository;
use agentry_types::chat::{ChatMessage, ChatSession, StoredMessage};
use agentry_types::error::RepositoryError;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ChatSessionRow {
    id: i64,
    session_id: String,
    account_id: i64,
    agent_id: Option<i64>,
    title: Option<String>,
    created_at: String,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            account_id: row.try_get("account_id")?,
            agent_id: row.try_get("agent_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        Ok(ChatSession {
            id: self.id,
            session_id,
            account_id: self.account_id,
            agent_id: self.agent_id,
            title: self.title,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct ChatMessageRow {
    id: i64,
    session_id: i64,
    message: String,
    created_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let message: StoredMessage = serde_json::from_str(&self.message)
            .map_err(|e| RepositoryError::Query(format!("invalid message body: {e}")))?;
        Ok(ChatMessage {
            id: self.id,
            session_id: self.session_id,
            message,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl ChatRepository for SqliteChatRepository {
    async fn get_session(
        &self,
        account_id: i64,
        session_id: &Uuid,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE session_id = ? AND account_id = ?")
            .bind(session_id.to_string())
            .bind(account_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(
                ChatSessionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_session()?,
            )),
            None => Ok(None),
        }
    }

    async fn create_session(
        &self,
        account_id: i64,
        agent_id: Option<i64>,
        session_id: &Uuid,
        title: &str,
    ) -> Result<ChatSession, RepositoryError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO chat_sessions (session_id, account_id, agent_id, title, created_at)
               VALUES (?, ?, ?, ?, ?)
               RETURNING id"#,
        )
        .bind(session_id.to_string())
        .bind(account_id)
        .bind(agent_id)
        .bind(title)
        .bind(format_datetime(&now))
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                RepositoryError::Conflict(format!("session {session_id} already exists"))
            } else {
                RepositoryError::Query(e.to_string())
            }
        })?;

        Ok(ChatSession {
            id,
            session_id: *session_id,
            account_id,
            agent_id,
            title: Some(title.to_string()),
            created_at: now,
        })
    }

    async fn append_message(
        &self,
        session_id: i64,
        message: &StoredMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        let body = serde_json::to_string(message)
            .map_err(|e| RepositoryError::Query(format!("serialize message: {e}")))?;
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO chat_messages (session_id, message, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(session_id)
        .bind(&body)
        .bind(format_datetime(&now))
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ChatMessage {
            id,
            session_id,
            message: message.clone(),
            created_at: now,
        })
    }

    async fn list_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE session_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                ChatMessageRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_message()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::tests::{insert_account, insert_agent, test_pool};
    use agentry_types::chat::ChatRole;
    use agentry_types::tool::{ToolCallRecord, ToolCallType};
    use serde_json::json;

    fn agent_config() -> serde_json::Value {
        json!({"schema": "agent_config", "version": 2, "data": {"systemPrompt": "hi"}})
    }

    #[tokio::test]
    async fn test_create_and_get_session_scoped_to_account() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_account(&pool, "alice@example.com").await;
        let bob = insert_account(&pool, "bob@example.com").await;
        let agent = insert_agent(&pool, alice, agent_config()).await;
        let repo = SqliteChatRepository::new(pool);

        let sid = Uuid::new_v4();
        let created = repo
            .create_session(alice, Some(agent), &sid, "Chat with Agent 1")
            .await
            .unwrap();
        assert_eq!(created.session_id, sid);

        let found = repo.get_session(alice, &sid).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.agent_id, Some(agent));
        assert_eq!(found.title.as_deref(), Some("Chat with Agent 1"));
        assert!(repo.get_session(bob, &sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_session_id_conflicts() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_account(&pool, "alice@example.com").await;
        let repo = SqliteChatRepository::new(pool);

        let sid = Uuid::new_v4();
        repo.create_session(alice, None, &sid, "first").await.unwrap();
        let err = repo.create_session(alice, None, &sid, "second").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_messages_roundtrip_in_order() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_account(&pool, "alice@example.com").await;
        let repo = SqliteChatRepository::new(pool);
        let session = repo
            .create_session(alice, None, &Uuid::new_v4(), "t")
            .await
            .unwrap();

        repo.append_message(session.id, &StoredMessage::human("What is X?"))
            .await
            .unwrap();
        let record = ToolCallRecord {
            tool_type: ToolCallType::VectorSearch,
            tool_name: "search_docs".to_string(),
            input: json!({"query": "X", "topK": 10}),
            output: json!({"results": [], "namespace": "docs", "index": "idx"}),
        };
        repo.append_message(session.id, &StoredMessage::ai("X is Y", vec![record.clone()]))
            .await
            .unwrap();

        let messages = repo.list_messages(session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message.role, ChatRole::Human);
        assert_eq!(messages[0].message.content, "What is X?");
        assert_eq!(messages[1].message.role, ChatRole::Ai);
        assert_eq!(messages[1].message.tool_calls.as_deref(), Some(&[record][..]));
        assert!(messages[0].id < messages[1].id);
    }

    #[tokio::test]
    async fn test_agent_delete_keeps_session() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_account(&pool, "alice@example.com").await;
        let agent = insert_agent(&pool, alice, agent_config()).await;
        let repo = SqliteChatRepository::new(pool.clone());
        let sid = Uuid::new_v4();
        repo.create_session(alice, Some(agent), &sid, "t").await.unwrap();

        sqlx::query("DELETE FROM agents WHERE id = ?")
            .bind(agent)
            .execute(&pool.writer)
            .await
            .unwrap();

        let session = repo.get_session(alice, &sid).await.unwrap().unwrap();
        assert!(session.agent_id.is_none());
    }
}
