//! Web search backends used by `perform_deep_search`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::llm::ProviderError;

const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

pub fn create_backend(config: &SearchConfig) -> Result<Box<dyn SearchBackend>> {
    match config.backend.as_str() {
        "brave" => {
            if config.api_key.is_empty() {
                anyhow::bail!("search backend 'brave' needs search.api_key or MEMO_SEARCH_API_KEY");
            }
            Ok(Box::new(BraveBackend::new(&config.api_key)?))
        }
        "none" => Ok(Box::new(DisabledBackend)),
        other => anyhow::bail!("unknown search backend: {other}. Supported: brave, none"),
    }
}

pub struct BraveBackend {
    client: Client,
    api_key: String,
}

impl BraveBackend {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

fn parse_brave(data: &Value, max_results: usize) -> Vec<SearchHit> {
    data["web"]["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| {
                    Some(SearchHit {
                        title: r["title"].as_str()?.to_string(),
                        url: r["url"].as_str()?.to_string(),
                        snippet: r["description"].as_str().unwrap_or("").to_string(),
                    })
                })
                .take(max_results)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchBackend for BraveBackend {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let url = reqwest::Url::parse_with_params(
            BRAVE_ENDPOINT,
            &[("q", query), ("count", &max_results.to_string())],
        )?;

        let resp = self
            .client
            .get(url)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::network(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "search API error");
            return Err(ProviderError::from_status(status.as_u16(), &body).into());
        }
        let data: Value = resp.json().await.map_err(|e| ProviderError::network(&e))?;
        Ok(parse_brave(&data, max_results))
    }
}

/// Used when no search backend is configured.
pub struct DisabledBackend;

#[async_trait]
impl SearchBackend for DisabledBackend {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        anyhow::bail!("web search is not configured")
    }
}
