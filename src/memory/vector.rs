//! Persistent vector index.
//!
//! [`VectorStore`] is the seam the memory engine talks to. [`SqliteVectorStore`]
//! keeps text and metadata in `memories` and vectors in the `memories_vec`
//! (sqlite-vec `vec0`) table, with `owner_id` as a metadata column so KNN is
//! filtered inside the index scan.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::embedding_to_bytes;
use super::types::{MemoryMetadata, VectorFilter, VectorHit, VectorRecord};
use crate::db::Database;

/// sqlite-vec refuses larger `k`.
const MAX_KNN_K: usize = 4096;
const CATEGORY_OVERFETCH: usize = 8;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the record with `record.id`.
    async fn upsert(&self, record: VectorRecord) -> Result<()>;

    /// Up to `k` nearest records matching `filter`, closest first.
    async fn query(&self, embedding: &[f32], k: usize, filter: &VectorFilter)
        -> Result<Vec<VectorHit>>;

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>>;

    /// Returns false if nothing was stored under `id`.
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub struct SqliteVectorStore {
    db: Database,
}

impl SqliteVectorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn upsert_sync(conn: &mut Connection, record: &VectorRecord) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT OR REPLACE INTO memories (id, owner_id, content, category, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.metadata.owner_id,
            record.content,
            record.metadata.category,
            record.metadata.created_at,
            record.metadata.updated_at,
        ],
    )?;
    // vec0 has no upsert
    tx.execute("DELETE FROM memories_vec WHERE memory_id = ?1", [&record.id])?;
    tx.execute(
        "INSERT INTO memories_vec (memory_id, owner_id, embedding) VALUES (?1, ?2, ?3)",
        params![
            record.id,
            record.metadata.owner_id,
            embedding_to_bytes(&record.embedding)
        ],
    )?;
    tx.commit()?;
    Ok(())
}

fn query_sync(
    conn: &Connection,
    embedding: &[f32],
    k: usize,
    filter: &VectorFilter,
) -> Result<Vec<VectorHit>> {
    // Category is not a vec0 column: skip the scan when the owner has none in
    // it, otherwise widen k and filter after the join.
    let scan_k = match filter.category.as_deref() {
        Some(category) => {
            let present: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM memories WHERE owner_id = ?1 AND category = ?2)",
                params![filter.owner_id, category],
                |r| r.get(0),
            )?;
            if !present {
                return Ok(Vec::new());
            }
            (k * CATEGORY_OVERFETCH).min(MAX_KNN_K)
        }
        None => k,
    };

    let mut stmt = conn.prepare(
        "WITH knn AS ( \
             SELECT memory_id, distance FROM memories_vec \
             WHERE embedding MATCH ?1 AND k = ?2 AND owner_id = ?3 \
         ) \
         SELECT m.id, m.content, knn.distance, m.owner_id, m.category, m.created_at, m.updated_at \
         FROM knn JOIN memories m ON m.id = knn.memory_id \
         ORDER BY knn.distance ASC",
    )?;

    let hits = stmt
        .query_map(
            params![embedding_to_bytes(embedding), scan_k as i64, filter.owner_id],
            |row| {
                Ok(VectorHit {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    distance: row.get::<_, f64>(2)? as f32,
                    metadata: MemoryMetadata {
                        owner_id: row.get(3)?,
                        category: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    },
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(hits
        .into_iter()
        .filter(|h| filter.matches(&h.metadata))
        .take(k)
        .collect())
}

fn get_sync(conn: &Connection, id: &str) -> Result<Option<VectorRecord>> {
    let row = conn
        .query_row(
            "SELECT m.id, m.content, m.owner_id, m.category, m.created_at, m.updated_at, v.embedding \
             FROM memories m JOIN memories_vec v ON v.memory_id = m.id WHERE m.id = ?1",
            [id],
            |row| {
                let bytes: Vec<u8> = row.get(6)?;
                Ok(VectorRecord {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    embedding: bytes_to_embedding(&bytes),
                    metadata: MemoryMetadata {
                        owner_id: row.get(2)?,
                        category: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    },
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn delete_sync(conn: &mut Connection, id: &str) -> Result<bool> {
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM memories WHERE id = ?1", [id])?;
    tx.execute("DELETE FROM memories_vec WHERE memory_id = ?1", [id])?;
    tx.commit()?;
    Ok(removed > 0)
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        self.db.call(move |conn| upsert_sync(conn, &record)).await
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = embedding.to_vec();
        let filter = filter.clone();
        self.db
            .call(move |conn| query_sync(conn, &embedding, k, &filter))
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let id = id.to_string();
        self.db.call(move |conn| get_sync(conn, &id)).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.db.call(move |conn| delete_sync(conn, &id)).await
    }
}
