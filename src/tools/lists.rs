use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{flexible_id, ToolError, ToolRegistry};
use crate::store::lists::{self as store, ListKind};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListTypeParams {
    #[schemars(description = "Which list: 'todo' or 'shopping'")]
    pub list_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateListTitleParams {
    #[schemars(description = "Which list: 'todo' or 'shopping'")]
    pub list_type: String,

    #[schemars(description = "New title for the list")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddListItemParams {
    #[schemars(description = "Which list: 'todo' or 'shopping'")]
    pub list_type: String,

    #[schemars(description = "Item text")]
    pub text: String,

    #[schemars(description = "Whether the item starts completed. Defaults to false.")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateListItemParams {
    #[serde(deserialize_with = "flexible_id")]
    #[schemars(with = "i64", description = "ID of the item to update")]
    pub item_id: i64,

    #[schemars(description = "New item text")]
    pub text: Option<String>,

    #[schemars(description = "New completion state")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemIdParams {
    #[serde(deserialize_with = "flexible_id")]
    #[schemars(with = "i64", description = "ID of the list item")]
    pub item_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MarkItemCompletedParams {
    #[serde(deserialize_with = "flexible_id")]
    #[schemars(with = "i64", description = "ID of the list item")]
    pub item_id: i64,

    #[schemars(description = "Completion state to set. Defaults to true.")]
    pub completed: Option<bool>,
}

fn parse_kind(tool: &str, raw: &str) -> Result<ListKind, ToolError> {
    raw.parse().map_err(|e: crate::store::StoreError| ToolError::InvalidParameters {
        tool: tool.into(),
        reason: e.to_string(),
    })
}

fn item_not_found(item_id: i64) -> ToolError {
    ToolError::NotFound(format!(
        "Item with ID {item_id} not found or doesn't belong to this user"
    ))
}

pub(super) async fn get(reg: &ToolRegistry, owner_id: i64, p: ListTypeParams) -> Result<Value, ToolError> {
    let kind = parse_kind("get_list", &p.list_type)?;
    let view = reg
        .db
        .call(move |conn| Ok(store::get_list_view(conn, owner_id, kind)?))
        .await?;
    Ok(json!({"status": "success", "list": view}))
}

pub(super) async fn update_title(
    reg: &ToolRegistry,
    owner_id: i64,
    p: UpdateListTitleParams,
) -> Result<Value, ToolError> {
    let kind = parse_kind("update_list_title", &p.list_type)?;
    let list = reg
        .db
        .call(move |conn| Ok(store::update_list_title(conn, owner_id, kind, &p.title)?))
        .await?;
    Ok(json!({
        "status": "success",
        "message": format!("List renamed to '{}'", list.title),
        "list": list,
    }))
}

pub(super) async fn clear(reg: &ToolRegistry, owner_id: i64, p: ListTypeParams) -> Result<Value, ToolError> {
    let kind = parse_kind("clear_list", &p.list_type)?;
    let removed = reg
        .db
        .call(move |conn| Ok(store::clear_list(conn, owner_id, kind)?))
        .await?;
    Ok(json!({
        "status": "success",
        "message": format!("Removed {removed} items from the {kind} list"),
        "removed": removed,
    }))
}

pub(super) async fn add_item(
    reg: &ToolRegistry,
    owner_id: i64,
    p: AddListItemParams,
) -> Result<Value, ToolError> {
    let kind = parse_kind("add_list_item", &p.list_type)?;
    if p.text.trim().is_empty() {
        return Err(ToolError::InvalidParameters {
            tool: "add_list_item".into(),
            reason: "text must not be empty".into(),
        });
    }
    let completed = p.completed.unwrap_or(false);
    let item = reg
        .db
        .call(move |conn| Ok(store::add_item(conn, owner_id, kind, p.text.trim(), completed)?))
        .await?;
    Ok(json!({
        "status": "success",
        "message": format!("Added '{}' to the {kind} list", item.text),
        "item": item,
    }))
}

pub(super) async fn update_item(
    reg: &ToolRegistry,
    owner_id: i64,
    p: UpdateListItemParams,
) -> Result<Value, ToolError> {
    let item_id = p.item_id;
    let item = reg
        .db
        .call(move |conn| {
            Ok(store::update_item(conn, owner_id, item_id, p.text.as_deref(), p.completed)?)
        })
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    Ok(json!({"status": "success", "message": "Item updated", "item": item}))
}

pub(super) async fn delete_item(
    reg: &ToolRegistry,
    owner_id: i64,
    p: ItemIdParams,
) -> Result<Value, ToolError> {
    let item_id = p.item_id;
    let deleted = reg
        .db
        .call(move |conn| Ok(store::delete_item(conn, owner_id, item_id)?))
        .await?;
    if !deleted {
        return Err(item_not_found(item_id));
    }
    Ok(json!({
        "status": "success",
        "message": format!("Item {item_id} deleted"),
        "item_id": item_id,
    }))
}

pub(super) async fn mark_completed(
    reg: &ToolRegistry,
    owner_id: i64,
    p: MarkItemCompletedParams,
) -> Result<Value, ToolError> {
    let item_id = p.item_id;
    let completed = p.completed.unwrap_or(true);
    let item = reg
        .db
        .call(move |conn| Ok(store::update_item(conn, owner_id, item_id, None, Some(completed))?))
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    let message = if completed {
        format!("Marked '{}' as completed", item.text)
    } else {
        format!("Marked '{}' as not completed", item.text)
    };
    Ok(json!({"status": "success", "message": message, "item": item}))
}
