//! Text-to-vector embedding.
//!
//! Provides the [`EmbeddingProvider`] trait with two implementations: a remote
//! OpenAI-compatible `/embeddings` client and an offline hashing embedder.
//! The provider is created via [`create_provider`] from configuration.

pub mod hashed;
pub mod remote;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly
/// [`EmbeddingProvider::dimensions`] floats.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;

    /// Identifier persisted in `schema_meta` to detect model switches.
    fn model_id(&self) -> &str;
}

/// Create an embedding provider from config.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "remote" => Ok(Box::new(remote::RemoteEmbeddingProvider::new(config)?)),
        "hashed" => Ok(Box::new(hashed::HashingEmbedder::new(config.dimensions))),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: remote, hashed"),
    }
}

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = crate::config::EmbeddingConfig {
            provider: "onnx".into(),
            ..Default::default()
        };
        assert!(create_provider(&config).is_err());
    }
}
