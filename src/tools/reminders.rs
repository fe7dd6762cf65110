use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{flexible_id, ToolError, ToolRegistry};
use crate::store::reminders::{self as store, ReminderPatch};
use crate::store::to_storage_time;

const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateReminderParams {
    #[schemars(description = "What to remind the user about")]
    pub text: String,

    #[schemars(
        description = "When to fire, ISO 8601 date-time (e.g. '2026-10-20T09:00:00'). Resolve relative dates like 'tomorrow' against the current time."
    )]
    pub due_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetRemindersParams {
    #[schemars(description = "Number of reminders to skip. Defaults to 0.")]
    pub skip: Option<u32>,

    #[schemars(description = "Maximum number of reminders to return. Defaults to 100.")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateReminderParams {
    #[serde(deserialize_with = "flexible_id")]
    #[schemars(with = "i64", description = "ID of the reminder to update")]
    pub reminder_id: i64,

    #[schemars(description = "New reminder text")]
    pub text: Option<String>,

    #[schemars(description = "New due date, ISO 8601 date-time")]
    pub due_date: Option<String>,

    #[schemars(description = "Set false to deactivate the reminder")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteReminderParams {
    #[serde(deserialize_with = "flexible_id")]
    #[schemars(with = "i64", description = "ID of the reminder to delete")]
    pub reminder_id: i64,
}

/// Parse a model-supplied due date. Offsets are honoured; naive date-times
/// are taken as UTC, bare dates as midnight UTC.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(super) async fn create(
    reg: &ToolRegistry,
    owner_id: i64,
    p: CreateReminderParams,
) -> Result<Value, ToolError> {
    let Some(due) = parse_due_date(&p.due_date) else {
        return Ok(json!({
            "status": "confirm_needed",
            "message": "Ask the user to confirm the due date and hour for this reminder.",
            "text": p.text,
            "due_date": p.due_date,
        }));
    };
    let due = to_storage_time(due);
    let reminder = reg
        .db
        .call(move |conn| Ok(store::create_reminder(conn, owner_id, &p.text, &due)?))
        .await?;
    tracing::info!(owner = owner_id, reminder = reminder.id, due = %reminder.due_date, "reminder created");
    Ok(json!({
        "status": "success",
        "message": format!("Reminder set: {}", reminder.text),
        "reminder": reminder,
    }))
}

pub(super) async fn list(
    reg: &ToolRegistry,
    owner_id: i64,
    p: GetRemindersParams,
) -> Result<Value, ToolError> {
    let skip = p.skip.unwrap_or(0);
    let limit = p.limit.unwrap_or(DEFAULT_LIMIT);
    let reminders = reg
        .db
        .call(move |conn| Ok(store::list_reminders(conn, owner_id, skip, limit)?))
        .await?;
    Ok(json!({
        "status": "success",
        "count": reminders.len(),
        "reminders": reminders,
    }))
}

pub(super) async fn update(
    reg: &ToolRegistry,
    owner_id: i64,
    p: UpdateReminderParams,
) -> Result<Value, ToolError> {
    let due_date = match p.due_date.as_deref() {
        Some(raw) => Some(to_storage_time(parse_due_date(raw).ok_or_else(|| {
            ToolError::InvalidParameters {
                tool: "update_reminder".into(),
                reason: format!("could not understand the date '{raw}'"),
            }
        })?)),
        None => None,
    };
    let patch = ReminderPatch {
        text: p.text,
        due_date,
        is_active: p.is_active,
    };
    let id = p.reminder_id;
    let updated = reg
        .db
        .call(move |conn| Ok(store::update_reminder(conn, owner_id, id, &patch)?))
        .await?
        .ok_or_else(|| ToolError::NotFound(format!("Reminder with ID {id} not found")))?;
    Ok(json!({
        "status": "success",
        "message": "Reminder updated",
        "reminder": updated,
    }))
}

pub(super) async fn delete(
    reg: &ToolRegistry,
    owner_id: i64,
    p: DeleteReminderParams,
) -> Result<Value, ToolError> {
    let id = p.reminder_id;
    let deleted = reg
        .db
        .call(move |conn| Ok(store::delete_reminder(conn, owner_id, id)?))
        .await?;
    if !deleted {
        return Err(ToolError::NotFound(format!("Reminder with ID {id} not found")));
    }
    Ok(json!({
        "status": "success",
        "message": format!("Reminder {id} deleted"),
        "reminder_id": id,
    }))
}
