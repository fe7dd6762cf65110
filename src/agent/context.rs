use std::collections::VecDeque;

use serde_json::Value;

use crate::llm::ChatMessage;

#[derive(Debug, Clone, PartialEq)]
struct Turn {
    user: String,
    assistant: String,
}

/// Per-session conversational state. Lives only in memory.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    /// Last classified intent, replayed when the user answers a clarification.
    pub last_intent: Option<Value>,
    pub awaiting_clarification: bool,
    history: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationContext {
    pub fn new(max_turns: usize) -> Self {
        Self {
            last_intent: None,
            awaiting_clarification: false,
            history: VecDeque::new(),
            max_turns,
        }
    }

    /// Record a finished exchange, dropping the oldest beyond the bound.
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.max_turns == 0 {
            return;
        }
        while self.history.len() >= self.max_turns {
            self.history.pop_front();
        }
        self.history.push_back(Turn {
            user: user.into(),
            assistant: assistant.into(),
        });
    }

    pub fn history_messages(&self) -> Vec<ChatMessage> {
        self.history
            .iter()
            .flat_map(|t| [ChatMessage::user(&t.user), ChatMessage::assistant(&t.assistant)])
            .collect()
    }

    pub fn turns(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.last_intent = None;
        self.awaiting_clarification = false;
        self.history.clear();
    }
}
