//! `dbRead`: read-only queries over a whitelisted application table.
//!
//! Every query is pinned to the caller's account through the table's
//! account column, whatever filters the model supplies. Sensitive columns
//! are never selected.

use std::collections::BTreeMap;

use agentry_core::tools::schema::input_schema;
use agentry_core::tools::{BoxTool, Tool, ToolBuildContext};
use agentry_types::error::AgentError;
use agentry_types::tool::{DbReadConfig, ToolDefinition, ToolOutput, ToolSpec};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use super::BuiltinToolDeps;
use crate::sqlite::pool::DatabasePool;

pub const DEFAULT_LIMIT: u32 = 50;

struct ReadableTable {
    name: &'static str,
    account_column: &'static str,
    sensitive: &'static [&'static str],
}

const READABLE_TABLES: &[ReadableTable] = &[
    ReadableTable {
        name: "agents",
        account_column: "account_id",
        sensitive: &[],
    },
    ReadableTable {
        name: "chat_sessions",
        account_column: "account_id",
        sensitive: &[],
    },
    ReadableTable {
        name: "credentials",
        account_column: "account_id",
        sensitive: &["encrypted_data"],
    },
    ReadableTable {
        name: "access_groups",
        account_column: "owner_account_id",
        sensitive: &[],
    },
];

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DbReadInput {
    /// Column equality filters, e.g. {"name": "Support bot"}.
    pub filters: Option<BTreeMap<String, Value>>,
    /// Maximum number of rows to return.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: Option<u32>,
}

pub struct DbReadTool {
    definition: ToolDefinition,
    pool: DatabasePool,
    table: &'static ReadableTable,
    columns: Vec<String>,
    account_id: i64,
    max_limit: u32,
}

pub async fn build_db_read(
    spec: ToolSpec,
    ctx: ToolBuildContext,
    deps: BuiltinToolDeps,
) -> Result<BoxTool, AgentError> {
    let config: DbReadConfig = spec.parse()?;
    let table = READABLE_TABLES
        .iter()
        .find(|t| t.name == config.table)
        .ok_or_else(|| AgentError::Config(format!("Table '{}' is not readable", config.table)))?;

    let table_columns = table_columns(&deps.pool, table.name).await?;
    let readable: Vec<String> = table_columns
        .into_iter()
        .filter(|c| !table.sensitive.contains(&c.as_str()))
        .collect();

    let columns = match &config.columns {
        Some(requested) => {
            let invalid: Vec<&String> = requested.iter().filter(|c| !readable.contains(c)).collect();
            if !invalid.is_empty() {
                return Err(AgentError::Config(format!(
                    "Invalid columns specified: {invalid:?}. Readable columns in '{}': {readable:?}",
                    table.name
                )));
            }
            requested.clone()
        }
        None => readable,
    };

    Ok(BoxTool::new(DbReadTool {
        definition: ToolDefinition {
            name: config.tool_name(),
            description: config.tool_description(),
            input_schema: input_schema::<DbReadInput>(),
        },
        pool: deps.pool,
        table,
        columns,
        account_id: ctx.account_id,
        max_limit: config.max_limit,
    }))
}

async fn table_columns(pool: &DatabasePool, table: &str) -> Result<Vec<String>, AgentError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(&pool.reader)
        .await
        .map_err(|e| AgentError::Config(format!("Failed to inspect table '{table}': {e}")))?;
    if rows.is_empty() {
        return Err(AgentError::Config(format!("Table '{table}' not found")));
    }
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decode one column by its runtime storage class.
fn column_value(row: &SqliteRow, index: usize) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index).map(Value::from).unwrap_or(Value::Null),
        "REAL" => row.try_get::<f64, _>(index).map(Value::from).unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(Value::Null),
        _ => row.try_get::<String, _>(index).map(Value::from).unwrap_or(Value::Null),
    }
}

impl DbReadTool {
    async fn query(&self, input: DbReadInput) -> Result<Vec<Map<String, Value>>, sqlx::Error> {
        let limit = input.limit.unwrap_or(DEFAULT_LIMIT).min(self.max_limit);
        let offset = input.offset.unwrap_or(0);

        let select = self.columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
        let mut sql = format!(
            "SELECT {select} FROM {} WHERE {} = ?",
            quote(self.table.name),
            quote(self.table.account_column)
        );

        let mut filters: Vec<(&String, &Value)> = Vec::new();
        for (column, value) in input.filters.iter().flatten() {
            if !self.columns.contains(column) {
                tracing::debug!(table = self.table.name, column = %column, "ignoring filter on unreadable column");
                continue;
            }
            if value.is_null() {
                sql.push_str(&format!(" AND {} IS NULL", quote(column)));
            } else {
                sql.push_str(&format!(" AND {} = ?", quote(column)));
                filters.push((column, value));
            }
        }
        sql.push_str(" LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql).bind(self.account_id);
        for (_, value) in &filters {
            query = bind_value(query, value);
        }
        let rows = query
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool.reader)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .enumerate()
                    .map(|(i, col)| (col.name().to_string(), column_value(row, i)))
                    .collect()
            })
            .collect())
    }
}

impl Tool for DbReadTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, input: Value) -> ToolOutput {
        let input: DbReadInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let rows = match self.query(input).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(table = self.table.name, error = %e, "dbRead query failed");
                return ToolOutput::error(format!("Query failed: {e}"));
            }
        };

        if rows.is_empty() {
            return ToolOutput::empty(format!("No rows found in {}", self.table.name));
        }

        let count = rows.len();
        let results: Vec<Value> = rows
            .into_iter()
            .map(|data| serde_json::json!({ "data": data }))
            .collect();
        let mut payload = Map::new();
        payload.insert("results".into(), Value::Array(results));
        payload.insert("table".into(), self.table.name.into());
        payload.insert("count".into(), count.into());
        ToolOutput::Success(payload)
    }
}
