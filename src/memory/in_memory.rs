use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::cosine_distance;
use super::types::{VectorFilter, VectorHit, VectorRecord};
use super::vector::VectorStore;

/// Brute-force store for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: Mutex<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, VectorRecord>>> {
        self.records
            .lock()
            .map_err(|e| anyhow::anyhow!("vector store lock poisoned: {e}"))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        self.lock()?.insert(record.id.clone(), record);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>> {
        let records = self.lock()?;
        let mut hits: Vec<VectorHit> = records
            .values()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| VectorHit {
                id: r.id.clone(),
                content: r.content.clone(),
                distance: cosine_distance(embedding, &r.embedding),
                metadata: r.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(id).is_some())
    }
}
