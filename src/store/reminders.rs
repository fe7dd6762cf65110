use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{now_rfc3339, StoreResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub owner_id: i64,
    pub text: String,
    /// UTC RFC 3339, second precision.
    pub due_date: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct ReminderPatch {
    pub text: Option<String>,
    pub due_date: Option<String>,
    pub is_active: Option<bool>,
}

/// A due reminder together with where to deliver it.
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub channel_id: Option<i64>,
}

const REMINDER_COLUMNS: &str = "id, owner_id, text, due_date, is_active, created_at, updated_at";

fn reminder_from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        text: row.get(2)?,
        due_date: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn create_reminder(
    conn: &Connection,
    owner_id: i64,
    text: &str,
    due_date: &str,
) -> StoreResult<Reminder> {
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO reminders (owner_id, text, due_date, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, 1, ?4, ?4)",
        params![owner_id, text, due_date, now],
    )?;
    Ok(Reminder {
        id: conn.last_insert_rowid(),
        owner_id,
        text: text.to_string(),
        due_date: due_date.to_string(),
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Owner's reminders ordered by due date.
pub fn list_reminders(
    conn: &Connection,
    owner_id: i64,
    skip: u32,
    limit: u32,
) -> StoreResult<Vec<Reminder>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REMINDER_COLUMNS} FROM reminders WHERE owner_id = ?1 \
         ORDER BY due_date ASC, id ASC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt
        .query_map(params![owner_id, limit, skip], reminder_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_reminder(conn: &Connection, owner_id: i64, id: i64) -> StoreResult<Option<Reminder>> {
    Ok(conn
        .query_row(
            &format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1 AND owner_id = ?2"),
            params![id, owner_id],
            reminder_from_row,
        )
        .optional()?)
}

pub fn update_reminder(
    conn: &Connection,
    owner_id: i64,
    id: i64,
    patch: &ReminderPatch,
) -> StoreResult<Option<Reminder>> {
    let Some(mut current) = get_reminder(conn, owner_id, id)? else {
        return Ok(None);
    };
    if let Some(text) = &patch.text {
        current.text = text.clone();
    }
    if let Some(due) = &patch.due_date {
        current.due_date = due.clone();
    }
    if let Some(active) = patch.is_active {
        current.is_active = active;
    }
    current.updated_at = now_rfc3339();

    conn.execute(
        "UPDATE reminders SET text = ?1, due_date = ?2, is_active = ?3, updated_at = ?4 \
         WHERE id = ?5 AND owner_id = ?6",
        params![
            current.text,
            current.due_date,
            current.is_active,
            current.updated_at,
            id,
            owner_id
        ],
    )?;
    Ok(Some(current))
}

pub fn delete_reminder(conn: &Connection, owner_id: i64, id: i64) -> StoreResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM reminders WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(deleted > 0)
}

/// Active reminders with `due_date <= now`, across all owners.
pub fn due_reminders(conn: &Connection, now: &str) -> StoreResult<Vec<DueReminder>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.owner_id, r.text, r.due_date, r.is_active, r.created_at, r.updated_at, \
                u.channel_id \
         FROM reminders r JOIN users u ON u.id = r.owner_id \
         WHERE r.is_active = 1 AND r.due_date <= ?1 \
         ORDER BY r.due_date ASC",
    )?;
    let rows = stmt
        .query_map([now], |row| {
            Ok(DueReminder {
                reminder: reminder_from_row(row)?,
                channel_id: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Deactivate a fired reminder. Returns false if it was already inactive.
pub fn mark_fired(conn: &Connection, id: i64) -> StoreResult<bool> {
    let updated = conn.execute(
        "UPDATE reminders SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        params![now_rfc3339(), id],
    )?;
    Ok(updated > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{test_db, users::create_user};

    #[test]
    fn crud_is_owner_scoped() {
        let conn = test_db();
        let alice = create_user(&conn, None).unwrap();
        let bob = create_user(&conn, None).unwrap();

        let r = create_reminder(&conn, alice.id, "dentist", "2030-01-01T09:00:00Z").unwrap();
        assert!(get_reminder(&conn, bob.id, r.id).unwrap().is_none());
        assert!(!delete_reminder(&conn, bob.id, r.id).unwrap());

        let patch = ReminderPatch {
            text: Some("dentist at 9".into()),
            ..Default::default()
        };
        assert!(update_reminder(&conn, bob.id, r.id, &patch).unwrap().is_none());
        let updated = update_reminder(&conn, alice.id, r.id, &patch).unwrap().unwrap();
        assert_eq!(updated.text, "dentist at 9");
        assert_eq!(updated.due_date, "2030-01-01T09:00:00Z");

        assert!(delete_reminder(&conn, alice.id, r.id).unwrap());
        assert!(list_reminders(&conn, alice.id, 0, 100).unwrap().is_empty());
    }

    #[test]
    fn list_is_paged_by_due_date() {
        let conn = test_db();
        let u = create_user(&conn, None).unwrap();
        create_reminder(&conn, u.id, "late", "2030-03-01T00:00:00Z").unwrap();
        create_reminder(&conn, u.id, "early", "2030-01-01T00:00:00Z").unwrap();
        create_reminder(&conn, u.id, "middle", "2030-02-01T00:00:00Z").unwrap();

        let page: Vec<String> = list_reminders(&conn, u.id, 1, 1)
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(page, vec!["middle"]);
    }

    #[test]
    fn due_reminders_respects_active_flag() {
        let conn = test_db();
        let u = create_user(&conn, Some(7)).unwrap();
        let past = create_reminder(&conn, u.id, "past", "2020-01-01T00:00:00Z").unwrap();
        create_reminder(&conn, u.id, "future", "2099-01-01T00:00:00Z").unwrap();

        let due = due_reminders(&conn, "2026-01-01T00:00:00Z").unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].reminder.id, past.id);
        assert_eq!(due[0].channel_id, Some(7));

        assert!(mark_fired(&conn, past.id).unwrap());
        assert!(!mark_fired(&conn, past.id).unwrap());
        assert!(due_reminders(&conn, "2026-01-01T00:00:00Z").unwrap().is_empty());
    }
}
