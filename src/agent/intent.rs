//! Intent classification and tool execution for one inbound message.
//!
//! The model sees the real tool catalog plus three pseudo-tools and picks
//! either pseudo-tool or any number of real tools. Models that answer in text
//! instead are parsed against the JSON action contract. Nothing here is
//! fatal: output that cannot be interpreted becomes a polite direct answer.

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use super::context::ConversationContext;
use super::prompts::{self, DIRECT_ANSWER, REQUEST_CLARIFICATION, REQUEST_CONFIRMATION};
use crate::llm::{ChatMessage, ChatModel, GenerationRequest, ModelReply, RequestedCall};
use crate::tools::{ToolOutcome, ToolRegistry};

pub const UNINTERPRETABLE: &str =
    "Sorry, I couldn't interpret that request. Could you rephrase it?";

static FENCE_WITH_LANG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\w*").expect("fence regex must compile"));

/// Remove Markdown code-fence delimiters, keeping the fenced content.
pub fn strip_code_fences(text: &str) -> String {
    FENCE_WITH_LANG.replace_all(text, "").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Intent {
    /// `answer` is the model's draft; the composer writes the final reply either way.
    DirectAnswer { answer: Option<String> },
    Clarify { question: String },
    Confirm { question: String, details: Option<Value> },
    UseTools {
        #[serde(serialize_with = "serialize_calls")]
        calls: Vec<RequestedCall>,
    },
}

fn serialize_calls<S: serde::Serializer>(calls: &[RequestedCall], s: S) -> Result<S::Ok, S::Error> {
    let plan: Vec<Value> = calls
        .iter()
        .map(|c| json!({"tool_name": c.name, "parameters": c.arguments}))
        .collect();
    plan.serialize(s)
}

/// Results of every tool call made in one turn, in request order.
#[derive(Debug, Clone, Serialize)]
pub struct ToolBundle {
    pub results: Vec<ToolOutcome>,
    /// Tool names in execution order; present only for multi-step turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<Vec<String>>,
}

/// What the recognizer hands back to the session for one turn.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Final text, returned as is. Only used when the model could not be understood.
    Answer(String),
    /// No tools needed; the composer replies, from the model's draft when there is one.
    Converse { draft: Option<String> },
    Clarification(String),
    Confirmation { question: String, details: Option<Value> },
    ToolResults(ToolBundle),
}

pub struct IntentRecognizer {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    model_name: String,
    temperature: f32,
}

impl IntentRecognizer {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        model_name: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            model,
            tools,
            model_name: model_name.into(),
            temperature,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Ask the model what to do with `message`. Only transport failures are errors.
    pub async fn classify(
        &self,
        message: &str,
        ctx: &ConversationContext,
        now: DateTime<Utc>,
    ) -> Result<Option<Intent>> {
        let previous = ctx
            .awaiting_clarification
            .then_some(ctx.last_intent.as_ref())
            .flatten();
        let mut messages = ctx.history_messages();
        messages.push(ChatMessage::user(prompts::intent_prompt(message, previous, now)));

        let mut tools = self.tools.declarations();
        tools.extend(prompts::pseudo_tool_declarations());

        let reply = self
            .model
            .generate(GenerationRequest {
                model: self.model_name.clone(),
                system: prompts::INTENT_SYSTEM.to_string(),
                messages,
                tools,
                temperature: self.temperature,
            })
            .await?;

        Ok(interpret_reply(reply))
    }

    /// Classify, update the context, and run any requested tools.
    pub async fn recognize(
        &self,
        message: &str,
        owner_identifier: &str,
        ctx: &mut ConversationContext,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome> {
        let Some(intent) = self.classify(message, ctx, now).await? else {
            tracing::warn!("model output could not be interpreted");
            ctx.awaiting_clarification = false;
            return Ok(TurnOutcome::Answer(UNINTERPRETABLE.to_string()));
        };

        tracing::info!(action = intent_label(&intent), "intent classified");
        ctx.awaiting_clarification = matches!(intent, Intent::Clarify { .. });
        ctx.last_intent = serde_json::to_value(&intent).ok();

        Ok(match intent {
            Intent::DirectAnswer { answer } => TurnOutcome::Converse { draft: answer },
            Intent::Clarify { question } => TurnOutcome::Clarification(question),
            Intent::Confirm { question, details } => TurnOutcome::Confirmation { question, details },
            Intent::UseTools { calls } => {
                TurnOutcome::ToolResults(self.execute(calls, owner_identifier).await)
            }
        })
    }

    /// Run calls in order. No retries; failures are recorded like successes.
    pub async fn execute(&self, calls: Vec<RequestedCall>, owner_identifier: &str) -> ToolBundle {
        let plan = (calls.len() > 1).then(|| calls.iter().map(|c| c.name.clone()).collect());
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let outcome = self
                .tools
                .execute(&call.name, call.arguments, owner_identifier)
                .await;
            tracing::debug!(tool = %outcome.tool_name, status = outcome.status(), "tool finished");
            results.push(outcome);
        }
        ToolBundle {
            results,
            execution_plan: plan,
        }
    }
}

fn intent_label(intent: &Intent) -> &'static str {
    match intent {
        Intent::DirectAnswer { .. } => "direct_answer",
        Intent::Clarify { .. } => "clarify",
        Intent::Confirm { .. } => "confirmation",
        Intent::UseTools { .. } => "use_tool",
    }
}

fn non_empty(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map a raw model reply to an intent. `None` means uninterpretable.
pub fn interpret_reply(reply: ModelReply) -> Option<Intent> {
    if !reply.tool_calls.is_empty() {
        return Some(from_tool_calls(reply.tool_calls));
    }
    let text = strip_code_fences(reply.text.as_deref().unwrap_or(""));
    if text.is_empty() {
        return None;
    }
    if text.starts_with('{') {
        return serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| from_action_json(&v));
    }
    // Plain prose without a tool call is the model answering directly.
    Some(Intent::DirectAnswer { answer: Some(text) })
}

/// The first pseudo-tool call, if any, decides the turn; otherwise every call runs.
fn from_tool_calls(calls: Vec<RequestedCall>) -> Intent {
    if let Some(pseudo) = calls.iter().find(|c| prompts::is_pseudo_tool(&c.name)) {
        let args = &pseudo.arguments;
        return match pseudo.name.as_str() {
            REQUEST_CLARIFICATION => Intent::Clarify {
                question: non_empty(&args["question"])
                    .unwrap_or_else(|| "Could you give me a bit more detail?".into()),
            },
            REQUEST_CONFIRMATION => Intent::Confirm {
                question: non_empty(&args["question"])
                    .unwrap_or_else(|| "Should I go ahead?".into()),
                details: args.get("details").filter(|d| !d.is_null()).cloned(),
            },
            _ => Intent::DirectAnswer {
                answer: non_empty(&args["answer"]),
            },
        };
    }
    Intent::UseTools { calls }
}

/// Legacy contract: `{"action": ..., "tool_name", "parameters", "execution_plan", ...}`.
fn from_action_json(v: &Value) -> Option<Intent> {
    match v["action"].as_str()? {
        "use_tool" => {
            let mut calls: Vec<RequestedCall> = v["execution_plan"]
                .as_array()
                .map(|steps| steps.iter().filter_map(call_from_step).collect())
                .unwrap_or_default();
            if calls.is_empty() {
                calls.extend(call_from_step(v));
            }
            if calls.is_empty() {
                return None;
            }
            Some(Intent::UseTools { calls })
        }
        "direct_answer" => Some(Intent::DirectAnswer {
            answer: non_empty(&v["answer"]).or_else(|| non_empty(&v["response"])),
        }),
        "clarify" => Some(Intent::Clarify {
            question: non_empty(&v["clarification_question"])?,
        }),
        "confirmation" => Some(Intent::Confirm {
            question: non_empty(&v["request_confirmation"])?,
            details: v.get("parameters").filter(|p| !p.is_null()).cloned(),
        }),
        "error" => Some(Intent::DirectAnswer {
            answer: Some(non_empty(&v["error_message"]).unwrap_or_else(|| UNINTERPRETABLE.into())),
        }),
        _ => None,
    }
}

fn call_from_step(step: &Value) -> Option<RequestedCall> {
    let name = non_empty(&step["tool_name"])?;
    let arguments = match step.get("parameters") {
        Some(p) if !p.is_null() => p.clone(),
        _ => json!({}),
    };
    Some(RequestedCall { name, arguments })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ModelReply {
        ModelReply {
            text: Some(s.into()),
            tool_calls: vec![],
        }
    }

    fn call(name: &str, arguments: Value) -> RequestedCall {
        RequestedCall {
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("plain"), "plain");
    }

    #[test]
    fn native_calls_become_use_tools() {
        let reply = ModelReply {
            text: None,
            tool_calls: vec![
                call("store_memory", json!({"content": "a"})),
                call("store_memory", json!({"content": "b"})),
            ],
        };
        assert!(matches!(interpret_reply(reply), Some(Intent::UseTools { calls }) if calls.len() == 2));
    }

    #[test]
    fn pseudo_tool_wins_over_real_calls() {
        let reply = ModelReply {
            text: None,
            tool_calls: vec![
                call("create_reminder", json!({})),
                call(REQUEST_CLARIFICATION, json!({"question": "At what time?"})),
            ],
        };
        assert_eq!(
            interpret_reply(reply),
            Some(Intent::Clarify {
                question: "At what time?".into()
            })
        );
    }

    #[test]
    fn legacy_json_with_execution_plan() {
        let raw = r#"```json
{"action": "use_tool", "execution_plan": [
  {"tool_name": "add_list_item", "parameters": {"list_type": "shopping", "text": "milk"}},
  {"tool_name": "add_list_item", "parameters": {"list_type": "shopping", "text": "eggs"}}
]}
```"#;
        match interpret_reply(text(raw)) {
            Some(Intent::UseTools { calls }) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[1].arguments["text"], "eggs");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn legacy_error_action_is_direct_answer() {
        let raw = r#"{"action": "error", "error_message": "I can only run 10 queries"}"#;
        assert_eq!(
            interpret_reply(text(raw)),
            Some(Intent::DirectAnswer {
                answer: Some("I can only run 10 queries".into())
            })
        );
    }

    #[test]
    fn broken_json_is_uninterpretable() {
        assert_eq!(interpret_reply(text("{\"action\": ")), None);
        assert_eq!(interpret_reply(text("{\"action\": \"dance\"}")), None);
        assert_eq!(interpret_reply(text("   ")), None);
    }

    #[test]
    fn prose_is_a_direct_answer() {
        assert_eq!(
            interpret_reply(text("Hello there!")),
            Some(Intent::DirectAnswer {
                answer: Some("Hello there!".into())
            })
        );
    }

    #[test]
    fn intent_serializes_with_action_tag() {
        let v = serde_json::to_value(Intent::UseTools {
            calls: vec![call("get_list", json!({"list_type": "todo"}))],
        })
        .unwrap();
        assert_eq!(v["action"], "use_tools");
        assert_eq!(v["calls"][0]["tool_name"], "get_list");
    }
}
