//! Per-owner chat sessions.
//!
//! Each owner gets one [`ConversationContext`] behind an async mutex, held for
//! the whole classify → execute → compose turn so two messages from the same
//! owner never interleave. Different owners run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use super::composer::{fallback_reply, ResponseComposer};
use super::context::ConversationContext;
use super::intent::{IntentRecognizer, ToolBundle, TurnOutcome, UNINTERPRETABLE};
use crate::llm::error::{user_message_for, ProviderError, ProviderErrorKind};

/// Typed as a message, this clears the session's context and history.
pub const RESET_COMMAND: &str = "\\resetintent";
pub const RESET_REPLY: &str = "Intent recognition has been reset.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
}

type SessionSlot = Arc<AsyncMutex<ConversationContext>>;

pub struct ChatSessions {
    recognizer: IntentRecognizer,
    composer: ResponseComposer,
    max_history_turns: usize,
    sessions: Mutex<HashMap<i64, SessionSlot>>,
}

impl ChatSessions {
    pub fn new(
        recognizer: IntentRecognizer,
        composer: ResponseComposer,
        max_history_turns: usize,
    ) -> Self {
        Self {
            recognizer,
            composer,
            max_history_turns,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, owner_id: i64) -> SessionSlot {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(
            sessions
                .entry(owner_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationContext::new(self.max_history_turns)))),
        )
    }

    /// Number of owners with a live session.
    pub fn session_count(&self) -> usize {
        match self.sessions.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Process one inbound message and produce exactly one reply.
    ///
    /// Sessions are keyed by resolved owner id, so the same person reaching
    /// us through different identifiers shares one context. Identifiers that
    /// resolve to nobody get an error reply and no session.
    pub async fn handle_message(&self, text: &str, owner_identifier: &str) -> Reply {
        let owner_id = match self.recognizer.tools().resolve_owner(owner_identifier).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(owner = %owner_identifier, "message from unresolved owner: {e}");
                return Reply {
                    text: e.user_message(),
                };
            }
        };
        let slot = self.slot(owner_id);
        let mut ctx = slot.lock().await;

        if text.trim() == RESET_COMMAND {
            ctx.reset();
            tracing::info!(owner = %owner_identifier, "session reset");
            return Reply {
                text: RESET_REPLY.to_string(),
            };
        }

        let now = chrono::Utc::now();
        let outcome = match self
            .recognizer
            .recognize(text, owner_identifier, &mut ctx, now)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if is_malformed(&e) => {
                tracing::warn!(owner = %owner_identifier, "unusable model reply: {e:#}");
                ctx.awaiting_clarification = false;
                TurnOutcome::Answer(UNINTERPRETABLE.to_string())
            }
            Err(e) => {
                tracing::error!(owner = %owner_identifier, "classification failed: {e:#}");
                return Reply {
                    text: user_message_for(&e).to_string(),
                };
            }
        };

        let reply = match outcome {
            TurnOutcome::Answer(answer) => answer,
            TurnOutcome::Clarification(question) => question,
            TurnOutcome::Confirmation { question, details } => render_confirmation(&question, details.as_ref()),
            TurnOutcome::Converse { draft } => {
                self.compose(text, Composition::Converse(draft.as_deref()), &ctx, now)
                    .await
            }
            TurnOutcome::ToolResults(bundle) => {
                self.compose(text, Composition::Tools(&bundle), &ctx, now).await
            }
        };

        ctx.push_turn(text, reply.clone());
        Reply { text: reply }
    }

    async fn compose(
        &self,
        text: &str,
        input: Composition<'_>,
        ctx: &ConversationContext,
        now: chrono::DateTime<chrono::Utc>,
    ) -> String {
        let (bundle, draft) = match input {
            Composition::Tools(bundle) => (Some(bundle), None),
            Composition::Converse(draft) => (None, draft),
        };
        match self
            .composer
            .compose(text, bundle, draft, ctx.history_messages(), now)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("composition failed: {e:#}");
                match draft {
                    Some(draft) => draft.to_string(),
                    None => fallback_reply(bundle),
                }
            }
        }
    }
}

/// What the composer is asked to write from.
enum Composition<'a> {
    Tools(&'a ToolBundle),
    /// Optional draft answer from the intent model.
    Converse(Option<&'a str>),
}

fn is_malformed(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ProviderError>()
        .is_some_and(|p| p.kind == ProviderErrorKind::Malformed)
}

/// Confirmation question followed by the supporting details, one per line.
fn render_confirmation(question: &str, details: Option<&serde_json::Value>) -> String {
    let Some(details) = details.and_then(|d| d.as_object()).filter(|d| !d.is_empty()) else {
        return question.to_string();
    };
    let lines: Vec<String> = details
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "user_id" | "owner_id"))
        .map(|(k, v)| match v.as_str() {
            Some(s) => format!("<b>{k}</b>: {s}"),
            None => format!("<b>{k}</b>: {v}"),
        })
        .collect();
    format!("{question}\n\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn confirmation_lists_details() {
        let text = render_confirmation(
            "Delete all items?",
            Some(&json!({"list_type": "shopping", "user_id": "7"})),
        );
        assert_eq!(text, "Delete all items?\n\n<b>list_type</b>: shopping");
    }

    #[test]
    fn confirmation_without_details_is_just_the_question() {
        assert_eq!(render_confirmation("Sure?", None), "Sure?");
        assert_eq!(render_confirmation("Sure?", Some(&json!({}))), "Sure?");
    }
}
