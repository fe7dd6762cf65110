//! Users and identifier resolution.
//!
//! A user has an internal integer id plus up to three external handles: a
//! numeric bot channel id, a web session token, and a shareable access key of
//! the form `MG-XXXX-XXXX`.

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{now_rfc3339, StoreError, StoreResult};

const ACCESS_KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ACCESS_KEY_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub access_key: String,
    pub channel_id: Option<i64>,
    pub web_token: Option<String>,
    pub created_at: String,
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        access_key: row.get(1)?,
        channel_id: row.get(2)?,
        web_token: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const USER_COLUMNS: &str = "id, access_key, channel_id, web_token, created_at";

/// `MG-` followed by two groups of four uppercase letters or digits.
pub fn generate_access_key() -> String {
    let mut rng = rand::rng();
    let mut group = || -> String {
        (0..4)
            .map(|_| ACCESS_KEY_ALPHABET[rng.random_range(0..ACCESS_KEY_ALPHABET.len())] as char)
            .collect()
    };
    let first = group();
    let second = group();
    format!("MG-{first}-{second}")
}

/// Create a user with a fresh unique access key.
pub fn create_user(conn: &Connection, channel_id: Option<i64>) -> StoreResult<User> {
    let now = now_rfc3339();
    for _ in 0..ACCESS_KEY_ATTEMPTS {
        let key = generate_access_key();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE access_key = ?1)",
            [&key],
            |r| r.get(0),
        )?;
        if taken {
            continue;
        }
        conn.execute(
            "INSERT INTO users (access_key, channel_id, created_at) VALUES (?1, ?2, ?3)",
            params![key, channel_id, now],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(user_id = id, "user created");
        return Ok(User {
            id,
            access_key: key,
            channel_id,
            web_token: None,
            created_at: now,
        });
    }
    Err(StoreError::AccessKeyExhausted)
}

pub fn get_user(conn: &Connection, id: i64) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
        .optional()?)
}

fn find_by_channel(conn: &Connection, channel_id: i64) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE channel_id = ?1"),
            [channel_id],
            user_from_row,
        )
        .optional()?)
}

fn find_by_token(conn: &Connection, token: &str) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE web_token = ?1"),
            [token],
            user_from_row,
        )
        .optional()?)
}

/// Look a user up by any identifier. Tried in order: channel id (when the
/// identifier is numeric), web token, internal id.
pub fn find_user(conn: &Connection, identifier: &str) -> StoreResult<Option<User>> {
    let identifier = identifier.trim();
    let numeric = identifier.parse::<i64>().ok();

    if let Some(n) = numeric {
        if let Some(user) = find_by_channel(conn, n)? {
            return Ok(Some(user));
        }
    }
    if let Some(user) = find_by_token(conn, identifier)? {
        return Ok(Some(user));
    }
    match numeric {
        Some(n) => get_user(conn, n),
        None => Ok(None),
    }
}

pub fn resolve_owner(conn: &Connection, identifier: &str) -> StoreResult<Option<i64>> {
    Ok(find_user(conn, identifier)?.map(|u| u.id))
}

/// First contact from a bot channel registers the user.
pub fn get_or_create_channel_user(conn: &Connection, channel_id: i64) -> StoreResult<User> {
    match find_by_channel(conn, channel_id)? {
        Some(user) => Ok(user),
        None => create_user(conn, Some(channel_id)),
    }
}

fn find_by_access_key(conn: &Connection, access_key: &str) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE access_key = ?1"),
            [access_key],
            user_from_row,
        )
        .optional()?)
}

/// Attach a web session token to the user owning `access_key`.
/// Returns `None` when the key is unknown.
///
/// Numeric tokens are refused: they would shadow channel and internal ids in
/// [`find_user`]. A token held by another user is refused too.
pub fn link_web_token(
    conn: &Connection,
    access_key: &str,
    web_token: &str,
) -> StoreResult<Option<User>> {
    let web_token = web_token.trim();
    if web_token.is_empty() || web_token.parse::<i64>().is_ok() {
        return Err(StoreError::InvalidWebToken);
    }
    let Some(user) = find_by_access_key(conn, access_key.trim())? else {
        return Ok(None);
    };
    if let Some(holder) = find_by_token(conn, web_token)? {
        if holder.id != user.id {
            return Err(StoreError::WebTokenTaken);
        }
    }
    conn.execute(
        "UPDATE users SET web_token = ?1 WHERE id = ?2",
        params![web_token, user.id],
    )?;
    Ok(Some(User {
        web_token: Some(web_token.to_string()),
        ..user
    }))
}
