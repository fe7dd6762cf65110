use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::intent::{strip_code_fences, ToolBundle};
use super::prompts;
use crate::llm::{ChatMessage, ChatModel, GenerationRequest, ProviderError};

/// Writes the single user-facing reply, grounded in tool results when there are any.
pub struct ResponseComposer {
    model: Arc<dyn ChatModel>,
    model_name: String,
    temperature: f32,
}

impl ResponseComposer {
    pub fn new(model: Arc<dyn ChatModel>, model_name: impl Into<String>, temperature: f32) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            temperature,
        }
    }

    pub async fn compose(
        &self,
        message: &str,
        bundle: Option<&ToolBundle>,
        draft: Option<&str>,
        history: Vec<ChatMessage>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let results = bundle.map(serde_json::to_value).transpose()?;
        let mut messages = history;
        messages.push(ChatMessage::user(prompts::composer_prompt(
            message,
            results.as_ref(),
            draft,
            now,
        )));

        let reply = self
            .model
            .generate(GenerationRequest {
                model: self.model_name.clone(),
                system: prompts::COMPOSER_SYSTEM.to_string(),
                messages,
                tools: Vec::new(),
                temperature: self.temperature,
            })
            .await?;

        let text = strip_code_fences(reply.text.as_deref().unwrap_or(""));
        if text.is_empty() {
            return Err(ProviderError::malformed("composer returned no text").into());
        }
        Ok(text)
    }
}

/// Reply used when composition fails: the tools' own messages, one per line.
pub fn fallback_reply(bundle: Option<&ToolBundle>) -> String {
    let lines: Vec<String> = bundle
        .map(|b| {
            b.results
                .iter()
                .filter_map(|o| o.result["message"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if lines.is_empty() {
        "Sorry, I couldn't put together a reply just now. Please try again.".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutcome;
    use serde_json::json;

    #[test]
    fn fallback_uses_tool_messages() {
        let bundle = ToolBundle {
            results: vec![
                ToolOutcome {
                    tool_name: "store_memory".into(),
                    parameters: json!({}),
                    result: json!({"status": "success", "message": "I've stored: a"}),
                },
                ToolOutcome {
                    tool_name: "get_list".into(),
                    parameters: json!({}),
                    result: json!({"status": "success"}),
                },
            ],
            execution_plan: None,
        };
        assert_eq!(fallback_reply(Some(&bundle)), "I've stored: a");
        assert!(fallback_reply(None).starts_with("Sorry"));
    }
}
