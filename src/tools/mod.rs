//! Tool registry: the functions the model can call.
//!
//! Each tool has a typed parameter struct (its JSON schema is derived with
//! `schemars` and sent to the model), an executor, and a side-effect class.
//! [`ToolRegistry::execute`] never fails: every problem, from an unknown tool
//! name to a storage error, comes back as a `{status: "error", message}`
//! payload inside the [`ToolOutcome`].

pub mod lists;
pub mod memory;
pub mod reminders;
pub mod search;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::db::Database;
use crate::llm::ToolDeclaration;
use crate::memory::MemoryEngine;
use crate::search::SearchBackend;
use crate::store::{users, StoreError};

use lists::{AddListItemParams, ItemIdParams, ListTypeParams, MarkItemCompletedParams, UpdateListItemParams, UpdateListTitleParams};
use memory::{DeleteMemoryParams, RetrieveMemoryParams, StoreMemoryParams, UpdateMemoryParams};
use reminders::{CreateReminderParams, DeleteReminderParams, GetRemindersParams, UpdateReminderParams};
use search::DeepSearchParams;

/// Parameter keys that identify the caller; never echoed back to the model.
const OWNER_KEYS: [&str; 3] = ["user_id", "owner_id", "owner_identifier"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    ReadOnly,
    Mutating,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CreateReminder,
    GetReminders,
    UpdateReminder,
    DeleteReminder,
    PerformDeepSearch,
    StoreMemory,
    RetrieveMemory,
    UpdateMemory,
    DeleteMemory,
    GetList,
    UpdateListTitle,
    ClearList,
    AddListItem,
    UpdateListItem,
    DeleteListItem,
    MarkListItemCompleted,
}

impl ToolKind {
    pub const ALL: [ToolKind; 16] = [
        ToolKind::CreateReminder,
        ToolKind::GetReminders,
        ToolKind::UpdateReminder,
        ToolKind::DeleteReminder,
        ToolKind::PerformDeepSearch,
        ToolKind::StoreMemory,
        ToolKind::RetrieveMemory,
        ToolKind::UpdateMemory,
        ToolKind::DeleteMemory,
        ToolKind::GetList,
        ToolKind::UpdateListTitle,
        ToolKind::ClearList,
        ToolKind::AddListItem,
        ToolKind::UpdateListItem,
        ToolKind::DeleteListItem,
        ToolKind::MarkListItemCompleted,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateReminder => "create_reminder",
            Self::GetReminders => "get_reminders",
            Self::UpdateReminder => "update_reminder",
            Self::DeleteReminder => "delete_reminder",
            Self::PerformDeepSearch => "perform_deep_search",
            Self::StoreMemory => "store_memory",
            Self::RetrieveMemory => "retrieve_memory",
            Self::UpdateMemory => "update_memory",
            Self::DeleteMemory => "delete_memory",
            Self::GetList => "get_list",
            Self::UpdateListTitle => "update_list_title",
            Self::ClearList => "clear_list",
            Self::AddListItem => "add_list_item",
            Self::UpdateListItem => "update_list_item",
            Self::DeleteListItem => "delete_list_item",
            Self::MarkListItemCompleted => "mark_list_item_completed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CreateReminder => "Creates a new reminder for the user. due_date must be an ISO 8601 date-time computed from the current time.",
            Self::GetReminders => "Lists the user's reminders ordered by due date.",
            Self::UpdateReminder => "Updates an existing reminder's text, due date, or active state.",
            Self::DeleteReminder => "Deletes a reminder by id.",
            Self::PerformDeepSearch => "Searches the web for real-time information: current events, facts, weather, news, sports. Use 2 queries by default and never more than 10. Never simulate search results.",
            Self::StoreMemory => "Stores one piece of the user's personal information. Call once per fact; do not aggregate. Include all relevant details in content.",
            Self::RetrieveMemory => "Searches previously stored information. Formulate the most relevant query from the conversation even if the user did not state it explicitly.",
            Self::UpdateMemory => "Replaces previously stored information. The query should be as specific as possible; new_content is the complete new text.",
            Self::DeleteMemory => "Deletes previously stored information matching the query. The query should be as specific as possible.",
            Self::GetList => "Returns the user's todo or shopping list with all items.",
            Self::UpdateListTitle => "Renames the user's todo or shopping list.",
            Self::ClearList => "Removes every item from the user's todo or shopping list.",
            Self::AddListItem => "Adds one item to the user's todo or shopping list. Call once per item.",
            Self::UpdateListItem => "Changes the text or completion state of a list item.",
            Self::DeleteListItem => "Removes a list item by id.",
            Self::MarkListItemCompleted => "Marks a list item as completed (or not completed).",
        }
    }

    pub fn side_effect(&self) -> SideEffect {
        match self {
            Self::GetReminders | Self::RetrieveMemory | Self::GetList => SideEffect::ReadOnly,
            Self::PerformDeepSearch => SideEffect::External,
            _ => SideEffect::Mutating,
        }
    }

    fn parameters_schema(&self) -> Value {
        match self {
            Self::CreateReminder => schema::<CreateReminderParams>(),
            Self::GetReminders => schema::<GetRemindersParams>(),
            Self::UpdateReminder => schema::<UpdateReminderParams>(),
            Self::DeleteReminder => schema::<DeleteReminderParams>(),
            Self::PerformDeepSearch => schema::<DeepSearchParams>(),
            Self::StoreMemory => schema::<StoreMemoryParams>(),
            Self::RetrieveMemory => schema::<RetrieveMemoryParams>(),
            Self::UpdateMemory => schema::<UpdateMemoryParams>(),
            Self::DeleteMemory => schema::<DeleteMemoryParams>(),
            Self::GetList | Self::ClearList => schema::<ListTypeParams>(),
            Self::UpdateListTitle => schema::<UpdateListTitleParams>(),
            Self::AddListItem => schema::<AddListItemParams>(),
            Self::UpdateListItem => schema::<UpdateListItemParams>(),
            Self::DeleteListItem => schema::<ItemIdParams>(),
            Self::MarkListItemCompleted => schema::<MarkItemCompletedParams>(),
        }
    }

    pub fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// JSON schema for `T`, minus the keys function-calling endpoints reject.
fn schema<T: JsonSchema>() -> Value {
    let mut value = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(map) = value.as_object_mut() {
        map.remove("$schema");
        map.remove("title");
    }
    value
}

/// A validated request for one tool.
#[derive(Debug, Clone)]
pub enum ToolCall {
    CreateReminder(CreateReminderParams),
    GetReminders(GetRemindersParams),
    UpdateReminder(UpdateReminderParams),
    DeleteReminder(DeleteReminderParams),
    PerformDeepSearch(DeepSearchParams),
    StoreMemory(StoreMemoryParams),
    RetrieveMemory(RetrieveMemoryParams),
    UpdateMemory(UpdateMemoryParams),
    DeleteMemory(DeleteMemoryParams),
    GetList(ListTypeParams),
    UpdateListTitle(UpdateListTitleParams),
    ClearList(ListTypeParams),
    AddListItem(AddListItemParams),
    UpdateListItem(UpdateListItemParams),
    DeleteListItem(ItemIdParams),
    MarkListItemCompleted(MarkItemCompletedParams),
}

impl ToolCall {
    /// Validate raw model arguments against the tool's parameter struct.
    pub fn parse(kind: ToolKind, params: Value) -> Result<Self, ToolError> {
        fn de<T: DeserializeOwned>(kind: ToolKind, params: Value) -> Result<T, ToolError> {
            let params = if params.is_null() { json!({}) } else { params };
            serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters {
                tool: kind.name().to_string(),
                reason: e.to_string(),
            })
        }

        Ok(match kind {
            ToolKind::CreateReminder => Self::CreateReminder(de(kind, params)?),
            ToolKind::GetReminders => Self::GetReminders(de(kind, params)?),
            ToolKind::UpdateReminder => Self::UpdateReminder(de(kind, params)?),
            ToolKind::DeleteReminder => Self::DeleteReminder(de(kind, params)?),
            ToolKind::PerformDeepSearch => Self::PerformDeepSearch(de(kind, params)?),
            ToolKind::StoreMemory => Self::StoreMemory(de(kind, params)?),
            ToolKind::RetrieveMemory => Self::RetrieveMemory(de(kind, params)?),
            ToolKind::UpdateMemory => Self::UpdateMemory(de(kind, params)?),
            ToolKind::DeleteMemory => Self::DeleteMemory(de(kind, params)?),
            ToolKind::GetList => Self::GetList(de(kind, params)?),
            ToolKind::UpdateListTitle => Self::UpdateListTitle(de(kind, params)?),
            ToolKind::ClearList => Self::ClearList(de(kind, params)?),
            ToolKind::AddListItem => Self::AddListItem(de(kind, params)?),
            ToolKind::UpdateListItem => Self::UpdateListItem(de(kind, params)?),
            ToolKind::DeleteListItem => Self::DeleteListItem(de(kind, params)?),
            ToolKind::MarkListItemCompleted => Self::MarkListItemCompleted(de(kind, params)?),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("User not found or invalid")]
    OwnerNotFound,
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),
    #[error("Invalid parameters for {tool}: {reason}")]
    InvalidParameters { tool: String, reason: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    External(String),
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<StoreError> for ToolError {
    fn from(err: StoreError) -> Self {
        ToolError::Storage(err.into())
    }
}

impl ToolError {
    /// Message placed in the error payload. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ToolError::Storage(_) => {
                "I couldn't complete that because of an internal problem. Please try again.".into()
            }
            other => other.to_string(),
        }
    }
}

/// What one tool invocation produced, as recorded for the composer.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool_name: String,
    pub parameters: Value,
    pub result: Value,
}

impl ToolOutcome {
    pub fn status(&self) -> &str {
        self.result["status"].as_str().unwrap_or("unknown")
    }
}

/// Copy of `params` without caller-identifying keys.
pub fn strip_owner_fields(params: &Value) -> Value {
    let mut shown = params.clone();
    if let Some(map) = shown.as_object_mut() {
        for key in OWNER_KEYS {
            map.remove(key);
        }
    }
    shown
}

/// Accepts `5` or `"5"`; models are inconsistent about id types.
pub(crate) fn flexible_id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom("id must be an integer")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid id: {s}"))),
        other => Err(D::Error::custom(format!("invalid id: {other}"))),
    }
}

#[derive(Clone)]
pub struct ToolRegistry {
    db: Database,
    memory: MemoryEngine,
    search: Arc<dyn SearchBackend>,
    results_per_query: usize,
}

impl ToolRegistry {
    pub fn new(
        db: Database,
        memory: MemoryEngine,
        search: Arc<dyn SearchBackend>,
        results_per_query: usize,
    ) -> Self {
        Self {
            db,
            memory,
            search,
            results_per_query,
        }
    }

    /// Declarations for every real tool, in catalog order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        ToolKind::ALL.iter().map(ToolKind::declaration).collect()
    }

    /// Run one tool on behalf of `owner_identifier`. Never fails.
    pub async fn execute(
        &self,
        tool_name: &str,
        parameters: Value,
        owner_identifier: &str,
    ) -> ToolOutcome {
        let shown = strip_owner_fields(&parameters);
        let result = match self.try_execute(tool_name, parameters, owner_identifier).await {
            Ok(result) => result,
            Err(err) => {
                match &err {
                    ToolError::Storage(e) => tracing::error!(tool = %tool_name, "tool failed: {e:#}"),
                    other => tracing::warn!(tool = %tool_name, error = %other, "tool rejected"),
                }
                let description = ToolKind::from_name(tool_name).map(|k| k.description());
                json!({
                    "status": "error",
                    "message": err.user_message(),
                    "tool_description": description,
                })
            }
        };
        ToolOutcome {
            tool_name: tool_name.to_string(),
            parameters: shown,
            result,
        }
    }

    async fn try_execute(
        &self,
        tool_name: &str,
        parameters: Value,
        owner_identifier: &str,
    ) -> Result<Value, ToolError> {
        let kind = ToolKind::from_name(tool_name)
            .ok_or_else(|| ToolError::ToolNotFound(tool_name.to_string()))?;
        let owner_id = self.resolve_owner(owner_identifier).await?;
        let call = ToolCall::parse(kind, parameters)?;

        tracing::info!(owner = owner_id, tool = %tool_name, side_effect = ?kind.side_effect(), "executing tool");
        self.dispatch(call, owner_id).await
    }

    pub async fn resolve_owner(&self, identifier: &str) -> Result<i64, ToolError> {
        let identifier = identifier.to_string();
        self.db
            .call(move |conn| Ok(users::resolve_owner(conn, &identifier)?))
            .await?
            .ok_or(ToolError::OwnerNotFound)
    }

    async fn dispatch(&self, call: ToolCall, owner_id: i64) -> Result<Value, ToolError> {
        match call {
            ToolCall::CreateReminder(p) => reminders::create(self, owner_id, p).await,
            ToolCall::GetReminders(p) => reminders::list(self, owner_id, p).await,
            ToolCall::UpdateReminder(p) => reminders::update(self, owner_id, p).await,
            ToolCall::DeleteReminder(p) => reminders::delete(self, owner_id, p).await,
            ToolCall::PerformDeepSearch(p) => search::deep_search(self, p).await,
            ToolCall::StoreMemory(p) => memory::store(self, owner_id, p).await,
            ToolCall::RetrieveMemory(p) => memory::retrieve(self, owner_id, p).await,
            ToolCall::UpdateMemory(p) => memory::update(self, owner_id, p).await,
            ToolCall::DeleteMemory(p) => memory::delete(self, owner_id, p).await,
            ToolCall::GetList(p) => lists::get(self, owner_id, p).await,
            ToolCall::UpdateListTitle(p) => lists::update_title(self, owner_id, p).await,
            ToolCall::ClearList(p) => lists::clear(self, owner_id, p).await,
            ToolCall::AddListItem(p) => lists::add_item(self, owner_id, p).await,
            ToolCall::UpdateListItem(p) => lists::update_item(self, owner_id, p).await,
            ToolCall::DeleteListItem(p) => lists::delete_item(self, owner_id, p).await,
            ToolCall::MarkListItemCompleted(p) => lists::mark_completed(self, owner_id, p).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("direct_answer"), None);
    }

    #[test]
    fn side_effect_classes() {
        assert_eq!(ToolKind::GetList.side_effect(), SideEffect::ReadOnly);
        assert_eq!(ToolKind::PerformDeepSearch.side_effect(), SideEffect::External);
        assert_eq!(ToolKind::DeleteMemory.side_effect(), SideEffect::Mutating);
    }

    #[test]
    fn declarations_carry_object_schemas() {
        let decl = ToolKind::CreateReminder.declaration();
        assert_eq!(decl.parameters["type"], "object");
        assert!(decl.parameters["properties"]["due_date"].is_object());
        assert!(decl.parameters.get("$schema").is_none());
    }

    #[test]
    fn parse_rejects_missing_required_field() {
        let err = ToolCall::parse(ToolKind::StoreMemory, json!({"category": "x"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters { .. }));
    }

    #[test]
    fn parse_accepts_string_ids() {
        let call = ToolCall::parse(ToolKind::DeleteReminder, json!({"reminder_id": "12"})).unwrap();
        assert!(matches!(call, ToolCall::DeleteReminder(p) if p.reminder_id == 12));
    }

    #[test]
    fn owner_fields_are_stripped() {
        let shown = strip_owner_fields(&json!({"user_id": "42", "query": "wifi"}));
        assert_eq!(shown, json!({"query": "wifi"}));
    }
}
