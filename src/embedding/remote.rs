use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{l2_normalize, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::llm::{validate_base_url, ProviderError};

/// OpenAI-compatible `POST {base_url}/embeddings` client.
pub struct RemoteEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        validate_base_url(&config.base_url)?;
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

fn parse_embedding(data: &Value, expected: usize) -> Result<Vec<f32>> {
    let values = data["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| ProviderError::malformed("no embedding in response"))?;
    let mut v: Vec<f32> = values
        .iter()
        .map(|x| x.as_f64().map(|f| f as f32))
        .collect::<Option<_>>()
        .ok_or_else(|| ProviderError::malformed("non-numeric embedding value"))?;
    if v.len() != expected {
        return Err(ProviderError::malformed(format!(
            "embedding has {} dimensions, expected {expected}",
            v.len()
        ))
        .into());
    }
    l2_normalize(&mut v);
    Ok(v)
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.model,
            "input": text,
            "dimensions": self.dimensions,
        });
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(&e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ProviderError::network(&e))?;
        if !status.is_success() {
            tracing::error!(status = %status, "embedding API error");
            return Err(ProviderError::from_status(status.as_u16(), &text).into());
        }
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::malformed(format!("invalid JSON from embeddings: {e}")))?;
        parse_embedding(&data, self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        let data = json!({"data": [{"embedding": [3.0, 4.0]}]});
        let v = parse_embedding(&data, 2).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let data = json!({"data": [{"embedding": [1.0, 0.0, 0.0]}]});
        assert!(parse_embedding(&data, 2).is_err());
    }
}
