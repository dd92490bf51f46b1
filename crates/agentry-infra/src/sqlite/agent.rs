//! SQLite agent and access-control repository.
//!
//! Implements `AgentRepository` and `AccessRepository` from `agentry-core`.
//! The access check is one indexed query: ownership, or an `EXISTS` over
//! grant joined to membership. Nothing is cached.

use agentry_core::repository::agent::{AccessRepository, AgentRepository};
use agentry_types::agent::{Agent, AgentConfig};
use agentry_types::error::RepositoryError;
use sqlx::Row;

use super::parse_datetime;
use super::pool::DatabasePool;

pub struct SqliteAgentRepository {
    pool: DatabasePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct AgentRow {
    id: i64,
    account_id: i64,
    name: String,
    config: String,
    created_at: String,
    updated_at: String,
}

impl AgentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            name: row.try_get("name")?,
            config: row.try_get("config")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_agent(self) -> Result<Agent, RepositoryError> {
        let config: AgentConfig = serde_json::from_str(&self.config)
            .map_err(|e| RepositoryError::Query(format!("invalid agent config: {e}")))?;

        Ok(Agent {
            id: self.id,
            account_id: self.account_id,
            name: self.name,
            config,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl AgentRepository for SqliteAgentRepository {
    async fn get_agent(&self, agent_id: i64) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let agent_row =
                    AgentRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(agent_row.into_agent()?))
            }
            None => Ok(None),
        }
    }
}

impl AccessRepository for SqliteAgentRepository {
    async fn can_access(&self, account_id: i64, agent_id: i64) -> Result<bool, RepositoryError> {
        let allowed: i64 = sqlx::query_scalar(
            r#"SELECT EXISTS (
                   SELECT 1 FROM agents a
                   WHERE a.id = ?1 AND a.account_id = ?2
               ) OR EXISTS (
                   SELECT 1
                   FROM agent_access_grants g
                   JOIN access_group_members m ON m.access_group_id = g.access_group_id
                   WHERE g.agent_id = ?1 AND m.account_id = ?2
               )"#,
        )
        .bind(agent_id)
        .bind(account_id)
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(allowed != 0)
    }
}
