mod helpers;

use memogenius::db::{self, migrations, Database};
use memogenius::memory::MemoryEngine;
use memogenius::store::users;
use tempfile::TempDir;

fn table_names(conn: &rusqlite::Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type IN ('table') ORDER BY name")
        .unwrap();
    stmt.query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn fresh_database_has_every_table() {
    let dir = TempDir::new().unwrap();
    let conn = db::open_database(dir.path().join("nested/memo.db"), 16).unwrap();

    let tables = table_names(&conn);
    for expected in [
        "users",
        "reminders",
        "lists",
        "list_items",
        "memories",
        "memories_vec",
        "schema_meta",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }
    assert_eq!(
        migrations::get_schema_version(&conn).unwrap(),
        migrations::CURRENT_SCHEMA_VERSION
    );

    let journal: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(journal.to_lowercase(), "wal");
}

#[test]
fn reopening_is_idempotent_and_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo.db");

    let user = {
        let conn = db::open_database(&path, 16).unwrap();
        users::create_user(&conn, Some(12)).unwrap()
    };

    let conn = db::open_database(&path, 16).unwrap();
    let found = users::find_user(&conn, "12").unwrap().unwrap();
    assert_eq!(found.access_key, user.access_key);
}

#[test]
fn changing_dimensions_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo.db");
    db::open_database(&path, 16).unwrap();

    let err = db::open_database(&path, 32).err().unwrap();
    assert!(err.to_string().contains("embedding dimensions changed"));
}

#[tokio::test]
async fn memories_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo.db");

    let owner = {
        let database = Database::new(db::open_database(&path, helpers::DIM).unwrap());
        let owner = database
            .call(|conn| Ok(users::create_user(conn, None)?))
            .await
            .unwrap()
            .id;
        helpers::memory_engine(&database)
            .store(owner, "bike lock code is 2468", None)
            .await
            .unwrap();
        owner
    };

    let database = Database::new(db::open_database(&path, helpers::DIM).unwrap());
    let engine: MemoryEngine = helpers::memory_engine(&database);
    let found = engine.retrieve(owner, "bike lock code", 3).await.unwrap();
    assert_eq!(found.hits.len(), 1);
    assert_eq!(found.hits[0].content, "bike lock code is 2468");
}
