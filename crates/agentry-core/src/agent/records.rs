//! Tool-call and retrieval-call records.
//!
//! Each tool invocation is summarised into a [`ToolCallRecord`] whose input
//! and output keep only the fields relevant to its tool type. Reranked
//! searches also yield a retrieval-call entry for the `on_chain_end` record.

use serde_json::{Map, Value, json};

use agentry_types::tool::{ToolCallRecord, ToolCallType, ToolOutput};

fn pick(value: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    for key in keys {
        if let Some(v) = value.get(*key) {
            out.insert((*key).to_string(), v.clone());
        }
    }
    Value::Object(out)
}

fn search_results(output: &Value) -> Value {
    let results = output
        .get("results")
        .and_then(|r| r.as_array())
        .map(|results| {
            results
                .iter()
                .map(|r| pick(r, &["id", "score", "metadata"]))
                .collect()
        })
        .unwrap_or_default();
    Value::Array(results)
}

/// Summarise one tool invocation.
pub fn format_tool_call(name: &str, input: &Value, output: &ToolOutput) -> ToolCallRecord {
    let tool_type = ToolCallType::from_tool_name(name);
    let raw = output.to_value();

    let (input, output) = match (tool_type, output) {
        (ToolCallType::VectorSearch | ToolCallType::VectorSearchWithReranking, ToolOutput::Success(_)) => (
            json!({"query": input.get("query"), "topK": input.get("top_k")}),
            json!({
                "results": search_results(&raw),
                "namespace": raw.get("namespace"),
                "index": raw.get("index"),
            }),
        ),
        (ToolCallType::VectorSearch | ToolCallType::VectorSearchWithReranking, _) => (
            json!({"query": input.get("query"), "topK": input.get("top_k")}),
            raw,
        ),
        (ToolCallType::DbTableRead, ToolOutput::Success(_)) => (
            pick(input, &["filters", "limit", "offset"]),
            pick(&raw, &["results", "table", "count"]),
        ),
        (ToolCallType::DbTableRead, _) => (pick(input, &["filters", "limit", "offset"]), raw),
        (ToolCallType::DbTableWrite, _) => (
            json!({"data": input}),
            pick(&raw, &["success", "table", "inserted", "message", "error"]),
        ),
        (ToolCallType::Custom, _) => (input.clone(), raw),
    };

    ToolCallRecord {
        tool_type,
        tool_name: name.to_string(),
        input,
        output,
    }
}

/// Retrieval-call entry for a reranked search, `None` for other tools or
/// failed searches.
pub fn format_retrieval_call(name: &str, input: &Value, output: &ToolOutput) -> Option<Value> {
    if ToolCallType::from_tool_name(name) != ToolCallType::VectorSearchWithReranking {
        return None;
    }
    let ToolOutput::Success(payload) = output else {
        return None;
    };

    let results = payload.get("results").and_then(|r| r.as_array());
    let total = results.map_or(0, Vec::len);
    let reranked: Vec<Value> = results
        .into_iter()
        .flatten()
        .map(|r| {
            let metadata = r.get("metadata").cloned().unwrap_or(Value::Null);
            json!({
                "chunk_id": metadata.get("chunk_id").cloned().or_else(|| r.get("id").cloned()),
                "total_chunks": metadata.get("total_chunks").cloned().unwrap_or(total.into()),
                "relevance_score": r.get("score"),
                "similarity_score": r.get("similarity_score").or_else(|| r.get("score")),
                "content": metadata.get("content"),
                "filename": metadata.get("filename"),
            })
        })
        .collect();

    Some(json!({
        "query": input.get("query"),
        "namespace": payload.get("namespace"),
        "message": payload.get("message"),
        "reranked_results": reranked,
    }))
}
