//! Built-in tool builders and the registry that holds them.
//!
//! Each builder parses its typed config from the [`ToolSpec`], resolves what
//! it needs (credentials, index hosts, table metadata) and returns a ready
//! [`BoxTool`]. Builders run per request; everything they share lives in
//! [`BuiltinToolDeps`].

pub mod db_read;
pub mod db_write;
pub mod vector;

use std::sync::Arc;

use agentry_core::tools::registry::ToolRegistry;
use agentry_types::config::AppConfig;
use agentry_types::tool::{DB_READ, DB_WRITE, VECTOR_SEARCH, VECTOR_SEARCH_WITH_RERANKING};

use crate::sqlite::pool::DatabasePool;

/// Long-lived resources shared by every built-in tool.
#[derive(Clone)]
pub struct BuiltinToolDeps {
    pub http: reqwest::Client,
    pub pool: DatabasePool,
    pub config: Arc<AppConfig>,
}

/// Registry with the four built-in tool types.
pub fn builtin_registry(deps: BuiltinToolDeps) -> ToolRegistry {
    let search = deps.clone();
    let rerank = deps.clone();
    let read = deps.clone();

    ToolRegistry::builder()
        .register(VECTOR_SEARCH, move |spec, ctx| {
            vector::build_vector_search(spec, ctx, search.clone())
        })
        .register(VECTOR_SEARCH_WITH_RERANKING, move |spec, ctx| {
            vector::build_reranking_search(spec, ctx, rerank.clone())
        })
        .register(DB_READ, move |spec, ctx| db_read::build_db_read(spec, ctx, read.clone()))
        .register(DB_WRITE, db_write::build_db_write)
        .build()
}
