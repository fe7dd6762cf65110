use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::{validate_base_url, ChatModel, GenerationRequest, ModelReply, ProviderError, RequestedCall};

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format
/// (OpenAI, Gemini's compatibility layer, local servers).
pub struct OpenAiCompatibleModel {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatibleModel {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        validate_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

fn request_body(request: &GenerationRequest) -> Value {
    let mut messages = vec![json!({"role": "system", "content": request.system})];
    messages.extend(
        request
            .messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content})),
    );

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "temperature": request.temperature,
    });

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body["tools"] = json!(tools);
    }
    body
}

/// Pull text and tool calls out of a chat-completions response.
fn parse_completion(data: &Value) -> Result<ModelReply, ProviderError> {
    let message = data["choices"]
        .get(0)
        .map(|c| &c["message"])
        .ok_or_else(|| ProviderError::malformed("no choices in response"))?;

    let text = message["content"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .filter_map(|tc| {
                    let name = tc["function"]["name"].as_str()?.to_string();
                    // Arguments arrive as a JSON-encoded string; keep unparseable
                    // payloads as a raw string so validation reports them.
                    let arguments = match &tc["function"]["arguments"] {
                        Value::String(raw) => serde_json::from_str(raw)
                            .unwrap_or_else(|_| Value::String(raw.clone())),
                        Value::Null => json!({}),
                        other => other.clone(),
                    };
                    Some(RequestedCall { name, arguments })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ModelReply { text, tool_calls })
}

#[async_trait]
impl ChatModel for OpenAiCompatibleModel {
    async fn generate(&self, request: GenerationRequest) -> Result<ModelReply> {
        let body = request_body(&request);
        let url = format!("{}/chat/completions", self.base_url);
        info!(model = %request.model, tools = request.tools.len(), "calling model");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("model request failed: {e}");
                ProviderError::network(&e)
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ProviderError::network(&e))?;

        if !status.is_success() {
            error!(status = %status, "model API error");
            debug!(body = %text, "model API error body");
            return Err(ProviderError::from_status(status.as_u16(), &text).into());
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::malformed(format!("invalid JSON from model: {e}")))?;
        let reply = parse_completion(&data)?;
        debug!(
            has_text = reply.text.is_some(),
            tool_calls = reply.tool_calls.len(),
            "model replied"
        );
        Ok(reply)
    }
}
