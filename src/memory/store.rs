//! Write path: store a new memory, or rewrite the one a query resolves to.

use anyhow::Result;
use serde::Serialize;

use super::resolver::Resolution;
use super::types::{MemoryMetadata, VectorRecord};
use super::{memory_timestamp, ChangeOutcome, MemoryEngine};

#[derive(Debug, Clone, Serialize)]
pub struct StoredMemory {
    pub id: String,
    pub content: String,
    pub category: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedMemory {
    pub id: String,
    pub previous_content: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl MemoryEngine {
    /// Embed `content` and store it as a new record owned by `owner_id`.
    pub async fn store(
        &self,
        owner_id: i64,
        content: &str,
        category: Option<&str>,
    ) -> Result<StoredMemory> {
        let embedding = self.embedder.embed(content).await?;
        let now = memory_timestamp();
        let id = uuid::Uuid::now_v7().to_string();
        let category = category.map(str::to_string);

        self.vectors
            .upsert(VectorRecord {
                id: id.clone(),
                content: content.to_string(),
                embedding,
                metadata: MemoryMetadata {
                    owner_id,
                    category: category.clone(),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                },
            })
            .await?;

        tracing::info!(owner = owner_id, id = %id, "memory stored");
        Ok(StoredMemory {
            id,
            content: content.to_string(),
            category,
            created_at: now,
        })
    }

    /// Replace the content of the memory `query` resolves to. The embedding is
    /// regenerated, `created_at` and category are kept, `updated_at` refreshed.
    pub async fn update(
        &self,
        owner_id: i64,
        query: &str,
        new_content: &str,
        force: bool,
    ) -> Result<ChangeOutcome<UpdatedMemory>> {
        let target = match self.resolve(owner_id, query).await? {
            Resolution::NotFound => return Ok(ChangeOutcome::NotFound),
            Resolution::Ambiguous(candidates) if !force => {
                return Ok(ChangeOutcome::Ambiguous(candidates))
            }
            Resolution::Ambiguous(mut candidates) => candidates.swap_remove(0),
            Resolution::Unique(hit) => hit,
        };

        let embedding = self.embedder.embed(new_content).await?;
        let updated_at = memory_timestamp();
        let metadata = MemoryMetadata {
            updated_at: updated_at.clone(),
            ..target.metadata.clone()
        };
        self.vectors
            .upsert(VectorRecord {
                id: target.id.clone(),
                content: new_content.to_string(),
                embedding,
                metadata,
            })
            .await?;

        tracing::info!(owner = owner_id, id = %target.id, forced = force, "memory updated");
        Ok(ChangeOutcome::Done(UpdatedMemory {
            id: target.id,
            previous_content: target.content,
            content: new_content.to_string(),
            created_at: target.metadata.created_at,
            updated_at,
        }))
    }
}
