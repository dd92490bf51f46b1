//! SQLite credential repository.
//!
//! Rows hold vault ciphertext only; decryption happens in
//! `CredentialService`. Besides the read-side `CredentialRepository`, this
//! type exposes the listing and re-encryption used by key rotation.

use agentry_core::repository::credential::CredentialRepository;
use agentry_types::credential::{Credential, CredentialType};
use agentry_types::error::RepositoryError;
use chrono::Utc;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

pub struct SqliteCredentialRepository {
    pool: DatabasePool,
}

impl SqliteCredentialRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the credential for `(account_id, service_name)`.
    pub async fn store(
        &self,
        account_id: i64,
        service_name: &str,
        credential_type: &CredentialType,
        encrypted_data: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64, RepositoryError> {
        let now = format_datetime(&Utc::now());
        sqlx::query_scalar(
            r#"INSERT INTO credentials
                   (account_id, service_name, credential_type, encrypted_data, credential_metadata, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(account_id, service_name) DO UPDATE SET
                   credential_type = excluded.credential_type,
                   encrypted_data = excluded.encrypted_data,
                   credential_metadata = excluded.credential_metadata,
                   updated_at = excluded.updated_at
               RETURNING id"#,
        )
        .bind(account_id)
        .bind(service_name)
        .bind(credential_type.to_string())
        .bind(encrypted_data)
        .bind(metadata.to_string())
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    /// Every stored credential, for key rotation.
    pub async fn list_all(&self) -> Result<Vec<Credential>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM credentials ORDER BY id")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                CredentialRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_credential()
            })
            .collect()
    }

    /// Replace the ciphertext of one credential.
    pub async fn update_encrypted_data(
        &self,
        credential_id: i64,
        encrypted_data: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE credentials SET encrypted_data = ?, updated_at = ? WHERE id = ?",
        )
        .bind(encrypted_data)
        .bind(format_datetime(&Utc::now()))
        .bind(credential_id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn fetch_one(
        &self,
        sql: &str,
        account_id: i64,
        key: CredentialKey<'_>,
    ) -> Result<Option<Credential>, RepositoryError> {
        let query = sqlx::query(sql).bind(account_id);
        let query = match key {
            CredentialKey::Service(name) => query.bind(name),
            CredentialKey::Id(id) => query.bind(id),
        };
        let row = query
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(
                CredentialRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_credential()?,
            )),
            None => Ok(None),
        }
    }
}

enum CredentialKey<'a> {
    Service(&'a str),
    Id(i64),
}

struct CredentialRow {
    id: i64,
    account_id: i64,
    service_name: String,
    credential_type: String,
    encrypted_data: String,
    credential_metadata: String,
    created_at: String,
    updated_at: String,
}

impl CredentialRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            service_name: row.try_get("service_name")?,
            credential_type: row.try_get("credential_type")?,
            encrypted_data: row.try_get("encrypted_data")?,
            credential_metadata: row.try_get("credential_metadata")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_credential(self) -> Result<Credential, RepositoryError> {
        let credential_type: CredentialType = self
            .credential_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let metadata = serde_json::from_str(&self.credential_metadata)
            .unwrap_or_else(|_| serde_json::json!({}));

        Ok(Credential {
            id: self.id,
            account_id: self.account_id,
            service_name: self.service_name,
            credential_type,
            encrypted_data: self.encrypted_data,
            metadata,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl CredentialRepository for SqliteCredentialRepository {
    async fn get_by_service(
        &self,
        account_id: i64,
        service_name: &str,
    ) -> Result<Option<Credential>, RepositoryError> {
        self.fetch_one(
            "SELECT * FROM credentials WHERE account_id = ? AND service_name = ?",
            account_id,
            CredentialKey::Service(service_name),
        )
        .await
    }

    async fn get_by_id(
        &self,
        account_id: i64,
        credential_id: i64,
    ) -> Result<Option<Credential>, RepositoryError> {
        self.fetch_one(
            "SELECT * FROM credentials WHERE account_id = ? AND id = ?",
            account_id,
            CredentialKey::Id(credential_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::tests::{insert_account, test_pool};
    use serde_json::json;

    #[tokio::test]
    async fn test_store_and_lookup_scoped_to_account() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_account(&pool, "alice@example.com").await;
        let bob = insert_account(&pool, "bob@example.com").await;
        let repo = SqliteCredentialRepository::new(pool);

        let id = repo
            .store(alice, "OPENAI_API_KEY", &CredentialType::ApiKey, "cipher-1", &json!({"label": "main"}))
            .await
            .unwrap();

        let found = repo.get_by_service(alice, "OPENAI_API_KEY").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.encrypted_data, "cipher-1");
        assert_eq!(found.metadata["label"], "main");
        assert!(repo.get_by_service(bob, "OPENAI_API_KEY").await.unwrap().is_none());
        assert!(repo.get_by_id(bob, id).await.unwrap().is_none());
        assert!(repo.get_by_id(alice, id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_store_replaces_existing_service() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_account(&pool, "alice@example.com").await;
        let repo = SqliteCredentialRepository::new(pool);

        let first = repo
            .store(alice, "SUPABASE", &CredentialType::DbConnection, "old", &json!({}))
            .await
            .unwrap();
        let second = repo
            .store(alice, "SUPABASE", &CredentialType::DbConnection, "new", &json!({}))
            .await
            .unwrap();
        assert_eq!(first, second);

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].encrypted_data, "new");
        assert_eq!(all[0].credential_type, CredentialType::DbConnection);
    }

    #[tokio::test]
    async fn test_update_encrypted_data() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_account(&pool, "alice@example.com").await;
        let repo = SqliteCredentialRepository::new(pool);
        let id = repo
            .store(alice, "PINECONE_API_KEY", &CredentialType::ApiKey, "v1", &json!({}))
            .await
            .unwrap();

        repo.update_encrypted_data(id, "v2").await.unwrap();
        let found = repo.get_by_id(alice, id).await.unwrap().unwrap();
        assert_eq!(found.encrypted_data, "v2");
        assert!(matches!(
            repo.update_encrypted_data(id + 1, "x").await,
            Err(RepositoryError::NotFound)
        ));
    }
}
