//! To-do and shopping lists.
//!
//! Each owner has at most one list per [`ListKind`]; lists are created lazily
//! on first access. Item operations always join back to the parent list so an
//! item id from another owner behaves exactly like a missing one.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{now_rfc3339, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Todo,
    Shopping,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Todo, ListKind::Shopping];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Shopping => "shopping",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Todo => "To-Do List",
            Self::Shopping => "Shopping List",
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "to-do" | "to_do" => Ok(Self::Todo),
            "shopping" => Ok(Self::Shopping),
            other => Err(StoreError::UnknownListKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct List {
    pub id: i64,
    pub owner_id: i64,
    pub kind: ListKind,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListItem {
    pub id: i64,
    pub list_id: i64,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A list with its items, as returned to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    #[serde(flatten)]
    pub list: List,
    pub items: Vec<ListItem>,
    pub item_count: usize,
    pub completed_count: usize,
}

fn list_from_row(row: &Row<'_>) -> rusqlite::Result<List> {
    let kind: String = row.get(2)?;
    let kind = kind.parse::<ListKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(List {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind,
        title: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ListItem> {
    Ok(ListItem {
        id: row.get(0)?,
        list_id: row.get(1)?,
        text: row.get(2)?,
        completed: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const ITEM_COLUMNS: &str = "i.id, i.list_id, i.text, i.completed, i.created_at, i.updated_at";

/// Create any missing lists for the owner. Idempotent.
pub fn ensure_lists_exist(conn: &Connection, owner_id: i64) -> StoreResult<()> {
    let now = now_rfc3339();
    for kind in ListKind::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO lists (owner_id, kind, title, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![owner_id, kind.as_str(), kind.default_title(), now],
        )?;
    }
    Ok(())
}

pub fn get_or_create_list(conn: &Connection, owner_id: i64, kind: ListKind) -> StoreResult<List> {
    let existing = conn
        .query_row(
            "SELECT id, owner_id, kind, title, created_at, updated_at FROM lists \
             WHERE owner_id = ?1 AND kind = ?2",
            params![owner_id, kind.as_str()],
            list_from_row,
        )
        .optional()?;
    if let Some(list) = existing {
        return Ok(list);
    }

    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO lists (owner_id, kind, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        params![owner_id, kind.as_str(), kind.default_title(), now],
    )?;
    Ok(List {
        id: conn.last_insert_rowid(),
        owner_id,
        kind,
        title: kind.default_title().to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn list_items(conn: &Connection, list_id: i64) -> StoreResult<Vec<ListItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM list_items i WHERE i.list_id = ?1 ORDER BY i.id ASC"
    ))?;
    let items = stmt
        .query_map([list_id], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

pub fn get_list_view(conn: &Connection, owner_id: i64, kind: ListKind) -> StoreResult<ListView> {
    let list = get_or_create_list(conn, owner_id, kind)?;
    let items = list_items(conn, list.id)?;
    let completed_count = items.iter().filter(|i| i.completed).count();
    Ok(ListView {
        item_count: items.len(),
        completed_count,
        list,
        items,
    })
}

pub fn update_list_title(
    conn: &Connection,
    owner_id: i64,
    kind: ListKind,
    title: &str,
) -> StoreResult<List> {
    let mut list = get_or_create_list(conn, owner_id, kind)?;
    list.title = title.to_string();
    list.updated_at = now_rfc3339();
    conn.execute(
        "UPDATE lists SET title = ?1, updated_at = ?2 WHERE id = ?3",
        params![list.title, list.updated_at, list.id],
    )?;
    Ok(list)
}

/// Remove every item. Returns how many were removed.
pub fn clear_list(conn: &Connection, owner_id: i64, kind: ListKind) -> StoreResult<usize> {
    let list = get_or_create_list(conn, owner_id, kind)?;
    Ok(conn.execute("DELETE FROM list_items WHERE list_id = ?1", [list.id])?)
}

pub fn add_item(
    conn: &Connection,
    owner_id: i64,
    kind: ListKind,
    text: &str,
    completed: bool,
) -> StoreResult<ListItem> {
    let list = get_or_create_list(conn, owner_id, kind)?;
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO list_items (list_id, text, completed, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![list.id, text, completed, now],
    )?;
    Ok(ListItem {
        id: conn.last_insert_rowid(),
        list_id: list.id,
        text: text.to_string(),
        completed,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Fetch an item only if its parent list belongs to `owner_id`.
pub fn get_item(conn: &Connection, owner_id: i64, item_id: i64) -> StoreResult<Option<ListItem>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ITEM_COLUMNS} FROM list_items i JOIN lists l ON l.id = i.list_id \
                 WHERE i.id = ?1 AND l.owner_id = ?2"
            ),
            params![item_id, owner_id],
            item_from_row,
        )
        .optional()?)
}

pub fn update_item(
    conn: &Connection,
    owner_id: i64,
    item_id: i64,
    text: Option<&str>,
    completed: Option<bool>,
) -> StoreResult<Option<ListItem>> {
    let Some(mut item) = get_item(conn, owner_id, item_id)? else {
        return Ok(None);
    };
    if let Some(text) = text {
        item.text = text.to_string();
    }
    if let Some(completed) = completed {
        item.completed = completed;
    }
    item.updated_at = now_rfc3339();
    conn.execute(
        "UPDATE list_items SET text = ?1, completed = ?2, updated_at = ?3 WHERE id = ?4",
        params![item.text, item.completed, item.updated_at, item.id],
    )?;
    Ok(Some(item))
}

pub fn delete_item(conn: &Connection, owner_id: i64, item_id: i64) -> StoreResult<bool> {
    if get_item(conn, owner_id, item_id)?.is_none() {
        return Ok(false);
    }
    conn.execute("DELETE FROM list_items WHERE id = ?1", [item_id])?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{test_db, users::create_user};

    fn count_lists(conn: &Connection, owner_id: i64) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM lists WHERE owner_id = ?1", [owner_id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn ensure_lists_exist_is_idempotent() {
        let conn = test_db();
        let u = create_user(&conn, None).unwrap();
        ensure_lists_exist(&conn, u.id).unwrap();
        ensure_lists_exist(&conn, u.id).unwrap();
        assert_eq!(count_lists(&conn, u.id), 2);

        let todo = get_or_create_list(&conn, u.id, ListKind::Todo).unwrap();
        assert_eq!(todo.title, "To-Do List");
        assert_eq!(count_lists(&conn, u.id), 2);
    }

    #[test]
    fn parse_list_kind() {
        assert_eq!("Shopping".parse::<ListKind>().unwrap(), ListKind::Shopping);
        assert_eq!("to-do".parse::<ListKind>().unwrap(), ListKind::Todo);
        assert!("groceries".parse::<ListKind>().is_err());
    }

    #[test]
    fn view_counts_completed_items() {
        let conn = test_db();
        let u = create_user(&conn, None).unwrap();
        add_item(&conn, u.id, ListKind::Shopping, "milk", false).unwrap();
        let eggs = add_item(&conn, u.id, ListKind::Shopping, "eggs", false).unwrap();
        update_item(&conn, u.id, eggs.id, None, Some(true)).unwrap().unwrap();

        let view = get_list_view(&conn, u.id, ListKind::Shopping).unwrap();
        assert_eq!(view.item_count, 2);
        assert_eq!(view.completed_count, 1);

        assert_eq!(clear_list(&conn, u.id, ListKind::Shopping).unwrap(), 2);
        assert_eq!(get_list_view(&conn, u.id, ListKind::Shopping).unwrap().item_count, 0);
    }

    #[test]
    fn items_are_not_reachable_by_other_owners() {
        let conn = test_db();
        let alice = create_user(&conn, None).unwrap();
        let bob = create_user(&conn, None).unwrap();
        let item = add_item(&conn, alice.id, ListKind::Todo, "taxes", false).unwrap();

        assert!(get_item(&conn, bob.id, item.id).unwrap().is_none());
        assert!(update_item(&conn, bob.id, item.id, Some("x"), None).unwrap().is_none());
        assert!(!delete_item(&conn, bob.id, item.id).unwrap());
        assert!(delete_item(&conn, alice.id, item.id).unwrap());
    }
}
