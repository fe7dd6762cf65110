//! Delete path.

use anyhow::Result;

use super::resolver::Resolution;
use super::types::VectorHit;
use super::{ChangeOutcome, MemoryEngine};

impl MemoryEngine {
    /// Delete the memory `query` resolves to. With `force`, an ambiguous
    /// query deletes the closest match only.
    pub async fn delete(
        &self,
        owner_id: i64,
        query: &str,
        force: bool,
    ) -> Result<ChangeOutcome<VectorHit>> {
        let target = match self.resolve(owner_id, query).await? {
            Resolution::NotFound => return Ok(ChangeOutcome::NotFound),
            Resolution::Ambiguous(candidates) if !force => {
                return Ok(ChangeOutcome::Ambiguous(candidates))
            }
            Resolution::Ambiguous(mut candidates) => candidates.swap_remove(0),
            Resolution::Unique(hit) => hit,
        };

        // Ownership is re-read from the stored record, not trusted from the hit.
        match self.vectors.get(&target.id).await? {
            Some(record) if record.metadata.owner_id == owner_id => {}
            _ => return Ok(ChangeOutcome::NotFound),
        }

        if !self.vectors.delete(&target.id).await? {
            return Ok(ChangeOutcome::NotFound);
        }
        tracing::info!(owner = owner_id, id = %target.id, forced = force, "memory deleted");
        Ok(ChangeOutcome::Done(target))
    }
}
