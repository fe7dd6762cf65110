use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ToolError, ToolRegistry};

pub const MAX_QUERIES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeepSearchParams {
    #[serde(alias = "queryList")]
    #[schemars(
        description = "Specific search queries that together answer the user's question. Usually 2, at most 10."
    )]
    pub query_list: Vec<String>,
}

/// Run every query in order. Individual failures are reported per query;
/// the tool only fails when nothing succeeded.
pub(super) async fn deep_search(reg: &ToolRegistry, p: DeepSearchParams) -> Result<Value, ToolError> {
    let queries: Vec<String> = p
        .query_list
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    if queries.is_empty() {
        return Err(ToolError::InvalidParameters {
            tool: "perform_deep_search".into(),
            reason: "query_list must contain at least one query".into(),
        });
    }
    if queries.len() > MAX_QUERIES {
        return Err(ToolError::InvalidParameters {
            tool: "perform_deep_search".into(),
            reason: format!("I can perform only {MAX_QUERIES} searches at a time"),
        });
    }

    let mut searches = Vec::with_capacity(queries.len());
    let mut succeeded = 0usize;
    for query in &queries {
        match reg.search.search(query, reg.results_per_query).await {
            Ok(hits) => {
                succeeded += 1;
                searches.push(json!({"query": query, "results": hits}));
            }
            Err(e) => {
                tracing::warn!(query = %query, "search failed: {e:#}");
                searches.push(json!({"query": query, "error": "search failed"}));
            }
        }
    }

    if succeeded == 0 {
        return Err(ToolError::External(
            "Web search is unavailable right now.".into(),
        ));
    }
    Ok(json!({
        "status": "success",
        "searches": searches,
    }))
}
