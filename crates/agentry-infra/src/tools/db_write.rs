//! `dbWrite`: insert one row into a table of a caller-supplied database.
//!
//! The connection string comes from a `db_connection` credential and is
//! reached through `sqlx::Any`. The table and its whitelisted columns are
//! checked when the tool is built; each invocation opens a fresh connection
//! and closes it afterwards.
//!
//! SQLite columns are dynamically typed, so values are bound natively. On
//! Postgres every value is bound as text and cast to the column's declared
//! type, and `RETURNING` casts columns the Any driver cannot decode back to
//! text.

use std::collections::HashMap;

use agentry_core::service::credential::{CONNECTION_STRING_FIELD, get_value};
use agentry_core::tools::schema::RecordShape;
use agentry_core::tools::{BoxTool, Tool, ToolBuildContext};
use agentry_types::credential::CredentialType;
use agentry_types::error::AgentError;
use agentry_types::tool::{DbWriteConfig, ToolDefinition, ToolOutput, ToolSpec};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Any, AnyConnection, Column, Connection, Row, TypeInfo, ValueRef};

const ACCOUNT_COLUMN: &str = "account_id";
const ID_COLUMN: &str = "id";

/// Declared column types of a relation, formatted the way `CAST` accepts them.
const PG_COLUMN_TYPES: &str = "SELECT CAST(a.attname AS TEXT), CAST(format_type(a.atttypid, a.atttypmod) AS TEXT) \
     FROM pg_catalog.pg_attribute a \
     WHERE a.attrelid = to_regclass($1) AND a.attnum > 0 AND NOT a.attisdropped";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Only the scheme is ever echoed back; the rest of the URL holds credentials.
    fn from_url(url: &str) -> Result<Self, AgentError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(AgentError::Config(format!(
                "Unsupported database URL scheme '{other}'. Expected sqlite or postgres"
            ))),
        }
    }
}

pub struct DbWriteTool {
    definition: ToolDefinition,
    shape: RecordShape,
    connection_string: SecretString,
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    /// Declared types by column name. Empty on SQLite.
    column_types: HashMap<String, String>,
    /// `id` (when the table has one) followed by the whitelisted columns.
    returning: Vec<String>,
    inject_account_id: Option<i64>,
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

async fn connect(url: &str) -> Result<AnyConnection, sqlx::Error> {
    sqlx::any::install_default_drivers();
    AnyConnection::connect(url).await
}

async fn check_columns(conn: &mut AnyConnection, table: &str, columns: &[&str]) -> Result<(), sqlx::Error> {
    let select = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    let sql = format!("SELECT {select} FROM {} WHERE 1 = 0", quote(table));
    sqlx::query(&sql).fetch_all(&mut *conn).await.map(|_| ())
}

async fn postgres_column_types(
    conn: &mut AnyConnection,
    table: &str,
) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(PG_COLUMN_TYPES)
        .bind(quote(table))
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Postgres types the Any driver can decode without a cast.
fn any_decodable(pg_type: &str) -> bool {
    matches!(
        pg_type,
        "boolean" | "smallint" | "integer" | "bigint" | "real" | "double precision" | "text" | "bytea"
    ) || pg_type.starts_with("character varying")
}

/// Build the INSERT for the given input columns.
fn insert_sql(
    dialect: Dialect,
    table: &str,
    column_types: &HashMap<String, String>,
    insert: &[&str],
    returning: &[String],
) -> String {
    let column_sql = insert.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    let placeholders = insert
        .iter()
        .enumerate()
        .map(|(i, column)| match (dialect, column_types.get(*column)) {
            (Dialect::Postgres, Some(pg_type)) => format!("CAST(${} AS {pg_type})", i + 1),
            _ => format!("${}", i + 1),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let returning_sql = returning
        .iter()
        .map(|column| match (dialect, column_types.get(column)) {
            (Dialect::Postgres, Some(pg_type)) if !any_decodable(pg_type) => {
                format!("CAST({} AS TEXT) AS {}", quote(column), quote(column))
            }
            _ => quote(column),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({column_sql}) VALUES ({placeholders}) RETURNING {returning_sql}",
        quote(table)
    )
}

pub async fn build_db_write(spec: ToolSpec, ctx: ToolBuildContext) -> Result<BoxTool, AgentError> {
    let config: DbWriteConfig = spec.parse()?;

    let bad: Vec<&String> = std::iter::once(&config.table)
        .chain(&config.columns)
        .filter(|name| !is_identifier(name))
        .collect();
    if !bad.is_empty() {
        return Err(AgentError::Config(format!("Invalid identifiers: {bad:?}")));
    }
    if config.columns.is_empty() {
        return Err(AgentError::Config(format!(
            "dbWrite tool for '{}' must list at least one column",
            config.table
        )));
    }
    let unknown_required: Vec<&String> = config
        .required_columns
        .iter()
        .filter(|c| !config.columns.contains(c))
        .collect();
    if !unknown_required.is_empty() {
        return Err(AgentError::Config(format!(
            "Required columns not in columns: {unknown_required:?}"
        )));
    }

    let credential = ctx
        .credentials
        .get_credential_by_id(ctx.account_id, config.credential_id)
        .await?
        .ok_or_else(|| {
            AgentError::Credential(format!(
                "Credential with ID {} not found",
                config.credential_id
            ))
        })?;
    if credential.credential_type != CredentialType::DbConnection {
        return Err(AgentError::Credential(format!(
            "Credential {} is not a database connection. Expected type 'db_connection', got '{}'",
            config.credential_id, credential.credential_type
        )));
    }
    let connection_string = SecretString::from(get_value(&credential, CONNECTION_STRING_FIELD)?.to_string());
    let dialect = Dialect::from_url(connection_string.expose_secret())?;

    let mut conn = connect(connection_string.expose_secret()).await.map_err(|e| {
        AgentError::Credential(format!(
            "Failed to connect to database using credential {}: {e}",
            config.credential_id
        ))
    })?;

    let mut checked: Vec<&str> = config.columns.iter().map(String::as_str).collect();
    if config.inject_account_id && !checked.contains(&ACCOUNT_COLUMN) {
        checked.push(ACCOUNT_COLUMN);
    }
    let check_result = check_columns(&mut conn, &config.table, &checked).await;
    let has_id = check_columns(&mut conn, &config.table, &[ID_COLUMN]).await.is_ok();
    let types_result = match (dialect, &check_result) {
        (Dialect::Postgres, Ok(())) => postgres_column_types(&mut conn, &config.table).await,
        _ => Ok(HashMap::new()),
    };
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "closing dbWrite schema connection failed");
    }
    check_result.map_err(|e| {
        AgentError::Config(format!(
            "Table '{}' or columns {checked:?} not found: {e}",
            config.table
        ))
    })?;
    let column_types = types_result.map_err(|e| {
        AgentError::Config(format!("Could not read column types of '{}': {e}", config.table))
    })?;
    if dialect == Dialect::Postgres {
        let untyped: Vec<&&str> = checked.iter().filter(|c| !column_types.contains_key(**c)).collect();
        if !untyped.is_empty() {
            return Err(AgentError::Config(format!(
                "Column types of {untyped:?} in '{}' could not be resolved",
                config.table
            )));
        }
    }

    let shape = RecordShape::new(
        config
            .columns
            .iter()
            .map(|c| (c.clone(), config.required_columns.contains(c))),
    );
    let returning: Vec<String> = has_id
        .then(|| ID_COLUMN.to_string())
        .into_iter()
        .chain(config.columns.iter().filter(|c| *c != ID_COLUMN).cloned())
        .collect();
    tracing::debug!(
        account_id = ctx.account_id,
        table = %config.table,
        columns = ?config.columns,
        ?dialect,
        "built dbWrite tool"
    );

    Ok(BoxTool::new(DbWriteTool {
        definition: ToolDefinition {
            name: config.tool_name(),
            description: config.tool_description(),
            input_schema: shape.schema(),
        },
        shape,
        connection_string,
        dialect,
        table: config.table,
        columns: config.columns,
        column_types,
        returning,
        inject_account_id: config.inject_account_id.then_some(ctx.account_id),
    }))
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Any, AnyArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Null => query.bind(Option::<String>::None),
        other => query.bind(other.to_string()),
    }
}

/// Text form bound ahead of a Postgres `CAST`: strings as-is, everything
/// else as its JSON text (`true`, `4.5`, `{"a":1}`).
fn text_form(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn column_value(row: &AnyRow, index: usize) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    let decoded = match raw.type_info().name() {
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::from),
        "SMALLINT" => row.try_get::<i16, _>(index).map(Value::from),
        "INTEGER" => row.try_get::<i32, _>(index).map(Value::from),
        "BIGINT" => row.try_get::<i64, _>(index).map(Value::from),
        "REAL" => row.try_get::<f32, _>(index).map(Value::from),
        "DOUBLE" => row.try_get::<f64, _>(index).map(Value::from),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned())),
        _ => row.try_get::<String, _>(index).map(Value::from),
    };
    decoded.unwrap_or(Value::Null)
}

impl DbWriteTool {
    async fn insert(&self, data: &Map<String, Value>) -> Result<Map<String, Value>, sqlx::Error> {
        let columns: Vec<&str> = data.keys().map(String::as_str).collect();
        let sql = insert_sql(self.dialect, &self.table, &self.column_types, &columns, &self.returning);

        let mut conn = connect(self.connection_string.expose_secret()).await?;
        let result = async {
            let mut tx = conn.begin().await?;
            let mut query = sqlx::query(&sql);
            for value in data.values() {
                query = match self.dialect {
                    Dialect::Sqlite => bind_value(query, value),
                    Dialect::Postgres => query.bind(text_form(value)),
                };
            }
            let row = query.fetch_one(&mut *tx).await?;
            let inserted: Map<String, Value> = row
                .columns()
                .iter()
                .enumerate()
                .map(|(i, col)| (col.name().to_string(), column_value(&row, i)))
                .collect();
            tx.commit().await?;
            Ok(inserted)
        }
        .await;

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "closing dbWrite connection failed");
        }
        result
    }
}

impl Tool for DbWriteTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, input: Value) -> ToolOutput {
        let mut data = match self.shape.validate(&input) {
            Ok(data) => data,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        data.retain(|_, v| !v.is_null());
        if let Some(account_id) = self.inject_account_id {
            data.insert(ACCOUNT_COLUMN.into(), account_id.into());
        }
        if data.is_empty() {
            return ToolOutput::error(format!(
                "No valid columns provided. Allowed columns: {:?}",
                self.columns
            ));
        }

        match self.insert(&data).await {
            Ok(inserted) => {
                tracing::info!(table = %self.table, "dbWrite inserted row");
                let mut payload = Map::new();
                payload.insert("success".into(), true.into());
                payload.insert("table".into(), self.table.clone().into());
                payload.insert("inserted".into(), Value::Object(inserted));
                payload.insert(
                    "message".into(),
                    format!("Successfully inserted record into {}", self.table).into(),
                );
                ToolOutput::Success(payload)
            }
            Err(e) => {
                tracing::warn!(table = %self.table, error = %e, "dbWrite insert failed");
                ToolOutput::error(format!("Insert failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::tests::{insert_account, test_pool};
    use crate::tools::tests::{context, store_credential, vault};
    use serde_json::json;

    /// A separate SQLite database standing in for the caller's own database.
    async fn external_db(dir: &tempfile::TempDir) -> String {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("external.db").display());
        let mut conn = connect(&url).await.unwrap();
        sqlx::query(
            "CREATE TABLE leads (id INTEGER PRIMARY KEY AUTOINCREMENT, email TEXT NOT NULL, name TEXT, score REAL, account_id INTEGER)",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();
        url
    }

    async fn setup(credential_type: CredentialType) -> (crate::sqlite::pool::DatabasePool, tempfile::TempDir, i64, i64, String) {
        let (pool, dir) = test_pool().await;
        let url = external_db(&dir).await;
        let account = insert_account(&pool, "alice@example.com").await;
        let credential_id = store_credential(
            &pool,
            &vault(),
            account,
            "SUPABASE",
            credential_type,
            json!({"connection_string": url}),
        )
        .await;
        (pool, dir, account, credential_id, url)
    }

    fn spec(value: Value) -> ToolSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_identifier_rule() {
        assert!(is_identifier("leads"));
        assert!(is_identifier("_tmp_2"));
        assert!(!is_identifier("2leads"));
        assert!(!is_identifier("leads; DROP TABLE x"));
        assert!(!is_identifier(""));
    }

    #[tokio::test]
    async fn test_insert_with_injected_account() {
        let (pool, _dir, account, credential_id, url) = setup(CredentialType::DbConnection).await;
        let tool = build_db_write(
            spec(json!({
                "type": "dbWrite",
                "credentialId": credential_id,
                "table": "leads",
                "columns": ["email", "name", "score"],
                "requiredColumns": ["email"],
                "injectAccountId": true
            })),
            context(&pool, vault(), account),
        )
        .await
        .unwrap();
        assert_eq!(tool.name(), "insert_leads");
        assert_eq!(tool.definition().input_schema["required"], json!(["email"]));

        let output = tool
            .invoke(json!({"email": "a@b.c", "score": 4.5, "ignored": "x"}))
            .await
            .to_value();
        assert_eq!(output["status"], "success");
        assert_eq!(output["success"], true);
        assert_eq!(output["table"], "leads");
        assert_eq!(output["inserted"]["email"], "a@b.c");
        assert_eq!(output["inserted"]["id"], 1);
        assert!(output["inserted"]["name"].is_null());
        assert_eq!(output["message"], "Successfully inserted record into leads");

        let mut conn = connect(&url).await.unwrap();
        let (stored_account,): (i64,) = sqlx::query_as("SELECT account_id FROM leads WHERE id = 1")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(stored_account, account);
    }

    #[tokio::test]
    async fn test_missing_required_column_is_error_output() {
        let (pool, _dir, account, credential_id, _url) = setup(CredentialType::DbConnection).await;
        let tool = build_db_write(
            spec(json!({
                "type": "dbWrite",
                "credentialId": credential_id,
                "table": "leads",
                "columns": ["email", "name"],
                "requiredColumns": ["email"]
            })),
            context(&pool, vault(), account),
        )
        .await
        .unwrap();

        let output = tool.invoke(json!({"name": "Ann"})).await;
        assert_eq!(output, ToolOutput::error("Missing required columns: [\"email\"]"));
    }

    #[tokio::test]
    async fn test_unknown_column_fails_construction() {
        let (pool, _dir, account, credential_id, _url) = setup(CredentialType::DbConnection).await;
        let err = build_db_write(
            spec(json!({
                "type": "dbWrite",
                "credentialId": credential_id,
                "table": "leads",
                "columns": ["email", "phone"]
            })),
            context(&pool, vault(), account),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), "config_error");
    }

    #[tokio::test]
    async fn test_required_must_be_subset_of_columns() {
        let (pool, _dir, account, credential_id, _url) = setup(CredentialType::DbConnection).await;
        let err = build_db_write(
            spec(json!({
                "type": "dbWrite",
                "credentialId": credential_id,
                "table": "leads",
                "columns": ["name"],
                "requiredColumns": ["email"]
            })),
            context(&pool, vault(), account),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), "config_error");
    }

    #[tokio::test]
    async fn test_credential_must_be_db_connection() {
        let (pool, _dir, account, credential_id, _url) = setup(CredentialType::ApiKey).await;
        let err = build_db_write(
            spec(json!({
                "type": "dbWrite",
                "credentialId": credential_id,
                "table": "leads",
                "columns": ["email"]
            })),
            context(&pool, vault(), account),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), "credential_error");
        assert!(err.message().contains("not a database connection"));
    }

    #[tokio::test]
    async fn test_other_accounts_credential_is_not_found() {
        let (pool, _dir, _account, credential_id, _url) = setup(CredentialType::DbConnection).await;
        let mallory = insert_account(&pool, "mallory@example.com").await;
        let err = build_db_write(
            spec(json!({
                "type": "dbWrite",
                "credentialId": credential_id,
                "table": "leads",
                "columns": ["email"]
            })),
            context(&pool, vault(), mallory),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), "credential_error");
        assert_eq!(err.message(), format!("Credential with ID {credential_id} not found"));
    }

    fn pg_types() -> HashMap<String, String> {
        [
            ("id", "integer"),
            ("email", "text"),
            ("created", "date"),
            ("ref", "uuid"),
            ("account_id", "bigint"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(Dialect::from_url("sqlite://leads.db").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("postgres://u:p@db/app").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("postgresql://u:p@db/app").unwrap(), Dialect::Postgres);

        let err = Dialect::from_url("mysql://root:hunter2@db/app").unwrap_err();
        assert_eq!(err.kind(), "config_error");
        assert!(!err.message().contains("hunter2"));
    }

    #[test]
    fn test_postgres_insert_casts_placeholders_and_returning() {
        let returning = vec!["id".to_string(), "email".to_string(), "created".to_string(), "ref".to_string()];
        let sql = insert_sql(
            Dialect::Postgres,
            "leads",
            &pg_types(),
            &["account_id", "created", "email"],
            &returning,
        );
        assert_eq!(
            sql,
            "INSERT INTO \"leads\" (\"account_id\", \"created\", \"email\") \
             VALUES (CAST($1 AS bigint), CAST($2 AS date), CAST($3 AS text)) \
             RETURNING \"id\", \"email\", CAST(\"created\" AS TEXT) AS \"created\", CAST(\"ref\" AS TEXT) AS \"ref\""
        );
    }

    #[test]
    fn test_sqlite_insert_uses_plain_placeholders() {
        let sql = insert_sql(
            Dialect::Sqlite,
            "leads",
            &HashMap::new(),
            &["email", "score"],
            &["id".to_string(), "email".to_string()],
        );
        assert_eq!(
            sql,
            "INSERT INTO \"leads\" (\"email\", \"score\") VALUES ($1, $2) RETURNING \"id\", \"email\""
        );
    }

    #[test]
    fn test_any_decodable_types() {
        for pg_type in ["integer", "bigint", "boolean", "text", "double precision", "character varying(255)"] {
            assert!(any_decodable(pg_type), "{pg_type}");
        }
        for pg_type in ["date", "uuid", "jsonb", "numeric(10,2)", "timestamp with time zone", "character(2)"] {
            assert!(!any_decodable(pg_type), "{pg_type}");
        }
    }

    #[test]
    fn test_text_form_for_casts() {
        assert_eq!(text_form(&json!("2026-01-02")).as_deref(), Some("2026-01-02"));
        assert_eq!(text_form(&json!(true)).as_deref(), Some("true"));
        assert_eq!(text_form(&json!(4.5)).as_deref(), Some("4.5"));
        assert_eq!(text_form(&json!({"tier": "gold"})).as_deref(), Some(r#"{"tier":"gold"}"#));
        assert_eq!(text_form(&Value::Null), None);
    }

    #[tokio::test]
    #[ignore = "Requires AGENTRY_TEST_POSTGRES_URL"]
    async fn test_postgres_typed_columns() {
        let url = std::env::var("AGENTRY_TEST_POSTGRES_URL").expect("AGENTRY_TEST_POSTGRES_URL required");
        let table = format!("leads_{}", uuid::Uuid::new_v4().simple());
        let mut conn = connect(&url).await.unwrap();
        sqlx::query(&format!(
            "CREATE TABLE \"{table}\" (id serial PRIMARY KEY, email text NOT NULL, created date, \
             ref uuid, meta jsonb, score numeric(6,2), active boolean, account_id bigint)"
        ))
        .execute(&mut conn)
        .await
        .unwrap();

        let (pool, _dir) = test_pool().await;
        let account = insert_account(&pool, "alice@example.com").await;
        let credential_id = store_credential(
            &pool,
            &vault(),
            account,
            "SUPABASE",
            CredentialType::DbConnection,
            json!({"connection_string": url}),
        )
        .await;
        let tool = build_db_write(
            spec(json!({
                "type": "dbWrite",
                "credentialId": credential_id,
                "table": table,
                "columns": ["email", "created", "ref", "meta", "score", "active"],
                "requiredColumns": ["email"],
                "injectAccountId": true
            })),
            context(&pool, vault(), account),
        )
        .await
        .unwrap();

        let full = tool
            .invoke(json!({
                "email": "a@b.c",
                "created": "2026-01-02",
                "ref": "6f1c1c9e-8a4b-4c1e-9d52-3f0f8f2d6a10",
                "meta": {"tier": "gold"},
                "score": 4.5,
                "active": true
            }))
            .await
            .to_value();
        assert_eq!(full["status"], "success", "{full}");
        assert_eq!(full["inserted"]["id"], 1);
        assert_eq!(full["inserted"]["created"], "2026-01-02");
        assert_eq!(full["inserted"]["ref"], "6f1c1c9e-8a4b-4c1e-9d52-3f0f8f2d6a10");
        assert_eq!(full["inserted"]["meta"], r#"{"tier": "gold"}"#);
        assert_eq!(full["inserted"]["score"], "4.50");
        assert_eq!(full["inserted"]["active"], true);

        let text_only = tool.invoke(json!({"email": "x@y.z"})).await.to_value();
        assert_eq!(text_only["status"], "success", "{text_only}");
        assert!(text_only["inserted"]["created"].is_null());

        let (stored_account,): (i64,) =
            sqlx::query_as(&format!("SELECT account_id FROM \"{table}\" WHERE email = 'x@y.z'"))
                .fetch_one(&mut conn)
                .await
                .unwrap();
        assert_eq!(stored_account, account);

        sqlx::query(&format!("DROP TABLE \"{table}\""))
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
    }
}
