//! Owner-scoped relational records: users, reminders, lists.
//!
//! Every function takes a plain `&Connection` and is synchronous; async
//! callers go through [`crate::db::Database::call`]. Lookups that miss, or that
//! hit another owner's row, return `None` rather than an error.

pub mod lists;
pub mod reminders;
pub mod users;

/// Errors raised by the record layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unknown list type: {0} (expected 'todo' or 'shopping')")]
    UnknownListKind(String),
    #[error("access key space exhausted")]
    AccessKeyExhausted,
    #[error("web token must be non-empty and not a number")]
    InvalidWebToken,
    #[error("web token is already linked to another user")]
    WebTokenTaken,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Current time in the canonical storage format.
pub(crate) fn now_rfc3339() -> String {
    to_storage_time(chrono::Utc::now())
}

/// Timestamps are stored as second-precision UTC RFC 3339 strings so that
/// lexicographic comparison in SQL matches chronological order.
pub fn to_storage_time(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
pub(crate) fn test_db() -> rusqlite::Connection {
    crate::db::open_in_memory(8).unwrap()
}
