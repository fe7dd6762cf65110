//! Read path: owner-scoped nearest-neighbour retrieval.

use anyhow::Result;

use super::resolver::{self, Resolution, MIN_RESOLVE_LIMIT};
use super::types::{VectorFilter, VectorHit};
use super::MemoryEngine;

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub hits: Vec<VectorHit>,
    /// Whether the top two hits are too close to call.
    pub ambiguous: bool,
}

impl MemoryEngine {
    /// Top `limit` memories for `query`, closest first.
    pub async fn retrieve(&self, owner_id: i64, query: &str, limit: usize) -> Result<Retrieval> {
        self.retrieve_in(owner_id, query, limit, None).await
    }

    /// Like [`Self::retrieve`], restricted to one category when given.
    pub async fn retrieve_in(
        &self,
        owner_id: i64,
        query: &str,
        limit: usize,
        category: Option<&str>,
    ) -> Result<Retrieval> {
        let filter = VectorFilter {
            owner_id,
            category: category.map(str::to_string),
        };
        let hits = self.nearest(&filter, query, limit).await?;
        let ambiguous = resolver::is_ambiguous(&hits);
        tracing::debug!(owner = owner_id, ?category, hits = hits.len(), ambiguous, "memory retrieved");
        Ok(Retrieval { hits, ambiguous })
    }

    /// Pick the single memory `query` refers to, if there is one.
    pub async fn resolve(&self, owner_id: i64, query: &str) -> Result<Resolution> {
        let hits = self
            .nearest(&VectorFilter::owner(owner_id), query, MIN_RESOLVE_LIMIT)
            .await?;
        Ok(resolver::resolve(hits))
    }

    async fn nearest(&self, filter: &VectorFilter, query: &str, limit: usize) -> Result<Vec<VectorHit>> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.vectors.query(&embedding, limit, filter).await?;
        // The store filters already; re-check on what comes back.
        Ok(hits.into_iter().filter(|h| filter.matches(&h.metadata)).collect())
    }
}
