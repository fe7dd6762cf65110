//! Semantic memory: store, retrieve, update, delete free-text facts per owner.
//!
//! [`MemoryEngine`] pairs an embedding provider with an injected
//! [`vector::VectorStore`]. Update and delete go through the ambiguity
//! [`resolver`] before touching anything.

pub mod forget;
pub mod in_memory;
pub mod resolver;
pub mod search;
pub mod store;
pub mod types;
pub mod vector;

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use types::VectorHit;
use vector::VectorStore;

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// `1 - cos(a, b)`. Zero-length inputs are treated as maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

/// Memory timestamps keep nanoseconds so an immediate update still sorts after creation.
pub(crate) fn memory_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// Result of an update or delete that first had to pick a target.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome<T> {
    Done(T),
    NotFound,
    /// Nothing was changed; these are the closest candidates.
    Ambiguous(Vec<VectorHit>),
}

#[derive(Clone)]
pub struct MemoryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
}

impl MemoryEngine {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, vectors: Arc<dyn VectorStore>) -> Self {
        Self { embedder, vectors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_basics() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn embedding_bytes_are_native_f32() {
        let bytes = embedding_to_bytes(&[1.0f32]);
        assert_eq!(bytes.len(), 4);
        assert_eq!(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 1.0);
    }
}
