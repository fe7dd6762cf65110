use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ToolError, ToolRegistry};
use crate::memory::resolver::format_candidates;
use crate::memory::types::VectorHit;
use crate::memory::ChangeOutcome;

const DEFAULT_RETRIEVE_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreMemoryParams {
    #[schemars(description = "The exact content to store, e.g. 'the WiFi password is 12345'. Include all relevant details.")]
    pub content: String,

    #[schemars(description = "Optional category, e.g. 'password', 'birthday', 'recipe'")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetrieveMemoryParams {
    #[schemars(description = "Search query deduced from the conversation")]
    pub query: String,

    #[schemars(description = "Maximum number of results. Defaults to 3.")]
    pub limit: Option<usize>,

    #[schemars(description = "Only search memories stored under this category, e.g. 'password'")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMemoryParams {
    #[schemars(description = "Query identifying the information to update, e.g. 'WiFi password'. Be as specific as possible.")]
    pub query: String,

    #[schemars(description = "The complete new content, with all relevant details")]
    pub new_content: String,

    #[schemars(description = "Set true only after the user picked among ambiguous matches; updates the closest one")]
    pub force: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteMemoryParams {
    #[schemars(description = "Query identifying the information to delete, e.g. 'WiFi password'. Be as specific as possible.")]
    pub query: String,

    #[schemars(description = "Set true only after the user picked among ambiguous matches; deletes the closest one")]
    pub force: Option<bool>,
}

fn hit_json(hit: &VectorHit) -> Value {
    json!({
        "content": hit.content,
        "category": hit.metadata.category,
        "created_at": hit.metadata.created_at,
        "updated_at": hit.metadata.updated_at,
        "distance": hit.distance,
    })
}

fn ambiguous_payload(query: &str, verb: &str, candidates: &[VectorHit]) -> Value {
    json!({
        "status": "ambiguous",
        "message": format!(
            "I found multiple possible matches for '{query}':\n{}\nCould you be more specific about which information you want to {verb}?",
            format_candidates(candidates)
        ),
        "candidates": candidates.iter().map(|h| h.content.as_str()).collect::<Vec<_>>(),
    })
}

pub(super) async fn store(
    reg: &ToolRegistry,
    owner_id: i64,
    p: StoreMemoryParams,
) -> Result<Value, ToolError> {
    if p.content.trim().is_empty() {
        return Err(ToolError::InvalidParameters {
            tool: "store_memory".into(),
            reason: "content must not be empty".into(),
        });
    }
    let stored = reg
        .memory
        .store(owner_id, &p.content, p.category.as_deref())
        .await?;
    Ok(json!({
        "status": "success",
        "message": format!("I've stored: {}", stored.content),
        "memory": stored,
    }))
}

pub(super) async fn retrieve(
    reg: &ToolRegistry,
    owner_id: i64,
    p: RetrieveMemoryParams,
) -> Result<Value, ToolError> {
    let limit = p.limit.unwrap_or(DEFAULT_RETRIEVE_LIMIT).max(1);
    let category = p.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let found = reg
        .memory
        .retrieve_in(owner_id, &p.query, limit, category)
        .await?;
    if found.hits.is_empty() {
        return Ok(json!({
            "status": "not_found",
            "message": "I couldn't find any information related to your request.",
        }));
    }
    Ok(json!({
        "status": "success",
        "ambiguous": found.ambiguous,
        "results": found.hits.iter().map(hit_json).collect::<Vec<_>>(),
    }))
}

pub(super) async fn update(
    reg: &ToolRegistry,
    owner_id: i64,
    p: UpdateMemoryParams,
) -> Result<Value, ToolError> {
    let force = p.force.unwrap_or(false);
    match reg
        .memory
        .update(owner_id, &p.query, &p.new_content, force)
        .await?
    {
        ChangeOutcome::NotFound => Ok(json!({
            "status": "not_found",
            "message": "I couldn't find the information to update.",
        })),
        ChangeOutcome::Ambiguous(candidates) => Ok(ambiguous_payload(&p.query, "update", &candidates)),
        ChangeOutcome::Done(updated) => Ok(json!({
            "status": "success",
            "message": "I've updated the information.",
            "previous_content": updated.previous_content,
            "content": updated.content,
            "created_at": updated.created_at,
            "updated_at": updated.updated_at,
        })),
    }
}

pub(super) async fn delete(
    reg: &ToolRegistry,
    owner_id: i64,
    p: DeleteMemoryParams,
) -> Result<Value, ToolError> {
    let force = p.force.unwrap_or(false);
    match reg.memory.delete(owner_id, &p.query, force).await? {
        ChangeOutcome::NotFound => Ok(json!({
            "status": "not_found",
            "message": "I couldn't find the information to delete.",
        })),
        ChangeOutcome::Ambiguous(candidates) => Ok(ambiguous_payload(&p.query, "delete", &candidates)),
        ChangeOutcome::Done(deleted) => Ok(json!({
            "status": "success",
            "message": format!("I've deleted the information: {}", deleted.content),
        })),
    }
}
