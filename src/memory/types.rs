//! Memory record types shared by the vector stores and the engine.

use serde::{Deserialize, Serialize};

/// Metadata stored alongside every memory vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Internal id of the owning user. Every read and write checks it.
    pub owner_id: i64,
    /// Free-form label such as `"password"` or `"birthday"`.
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A full record as written to a [`super::vector::VectorStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// UUID v7 (time-sortable).
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: MemoryMetadata,
}

/// One nearest-neighbour result. `distance` is cosine distance: 0 is identical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorHit {
    pub id: String,
    pub content: String,
    pub distance: f32,
    #[serde(flatten)]
    pub metadata: MemoryMetadata,
}

/// Restricts a query to one owner and optionally one category.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    pub owner_id: i64,
    pub category: Option<String>,
}

impl VectorFilter {
    pub fn owner(owner_id: i64) -> Self {
        Self {
            owner_id,
            category: None,
        }
    }

    pub fn matches(&self, metadata: &MemoryMetadata) -> bool {
        let category_ok = match self.category.as_deref() {
            Some(c) => metadata.category.as_deref() == Some(c),
            None => true,
        };
        metadata.owner_id == self.owner_id && category_ok
    }
}
