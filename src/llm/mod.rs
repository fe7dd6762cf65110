//! Generative-model abstraction.
//!
//! [`ChatModel`] is the single seam between the agent and any LLM: one
//! request (system prompt, history, optional tool declarations) in, one
//! [`ModelReply`] (text and/or requested tool calls) out.

pub mod error;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub use error::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A function the model may call: name, description, JSON schema of its arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDeclaration>,
    pub temperature: f32,
}

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<RequestedCall>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<ModelReply>;
}

pub fn create_model(config: &crate::config::LlmConfig) -> Result<Box<dyn ChatModel>> {
    Ok(Box::new(openai::OpenAiCompatibleModel::new(
        &config.base_url,
        &config.api_key,
        config.timeout_secs,
    )?))
}

/// HTTPS always; plain HTTP only for loopback, since the API key travels in a header.
pub fn validate_base_url(base_url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(base_url)
        .map_err(|e| anyhow::anyhow!("invalid base_url '{base_url}': {e}"))?;
    let host = parsed.host_str().unwrap_or("");

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1") => {
            warn!(base_url, "using unencrypted HTTP for a local model server");
            Ok(())
        }
        "http" => anyhow::bail!(
            "HTTP is only permitted for localhost (base_url: '{base_url}'); use HTTPS"
        ),
        scheme => anyhow::bail!("unsupported URL scheme '{scheme}' in base_url '{base_url}'"),
    }
}
