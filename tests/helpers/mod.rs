#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use memogenius::agent::{ChatSessions, IntentRecognizer, ResponseComposer};
use memogenius::db::{self, Database};
use memogenius::embedding::hashed::HashingEmbedder;
use memogenius::llm::{ChatModel, GenerationRequest, ModelReply, ProviderError, RequestedCall};
use memogenius::memory::vector::SqliteVectorStore;
use memogenius::memory::MemoryEngine;
use memogenius::search::DisabledBackend;
use memogenius::store::{lists, users};
use memogenius::tools::ToolRegistry;
use serde_json::{json, Value};

/// Wide enough that the handful of words in a test rarely share a bucket.
pub const DIM: usize = 1024;

/// Fresh in-memory database with the full schema and a 1024-wide vector table.
pub fn test_db() -> Database {
    Database::new(db::open_in_memory(DIM).unwrap())
}

pub async fn new_user(db: &Database, channel_id: Option<i64>) -> users::User {
    db.call(move |conn| {
        let user = users::create_user(conn, channel_id)?;
        lists::ensure_lists_exist(conn, user.id)?;
        Ok(user)
    })
    .await
    .unwrap()
}

pub fn memory_engine(db: &Database) -> MemoryEngine {
    MemoryEngine::new(
        Arc::new(HashingEmbedder::new(DIM)),
        Arc::new(SqliteVectorStore::new(db.clone())),
    )
}

pub fn registry(db: &Database) -> ToolRegistry {
    ToolRegistry::new(db.clone(), memory_engine(db), Arc::new(DisabledBackend), 5)
}

/// One scripted model response.
pub enum Step {
    Reply(ModelReply),
    /// A 200 response whose body could not be understood.
    Malformed,
}

/// Chat model that replays queued replies and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Step>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Arc<Self> {
        Self::with_steps(replies.into_iter().map(Step::Reply).collect())
    }

    pub fn with_steps(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Malformed) => Err(ProviderError::malformed("missing choices").into()),
            None => anyhow::bail!("scripted model ran out of replies"),
        }
    }
}

pub fn text_reply(text: &str) -> ModelReply {
    ModelReply {
        text: Some(text.to_string()),
        tool_calls: Vec::new(),
    }
}

pub fn call_reply(calls: Vec<(&str, Value)>) -> ModelReply {
    ModelReply {
        text: None,
        tool_calls: calls
            .into_iter()
            .map(|(name, arguments)| RequestedCall {
                name: name.to_string(),
                arguments,
            })
            .collect(),
    }
}

pub fn clarify_reply(question: &str) -> ModelReply {
    call_reply(vec![("request_clarification", json!({"question": question}))])
}

pub fn sessions(db: &Database, model: Arc<ScriptedModel>) -> ChatSessions {
    let recognizer = IntentRecognizer::new(model.clone(), registry(db), "intent-test", 0.0);
    let composer = ResponseComposer::new(model, "compose-test", 0.0);
    ChatSessions::new(recognizer, composer, 20)
}

/// Sessions over any chat model, for tests that wrap [`ScriptedModel`].
pub fn sessions_with(db: &Database, model: Arc<dyn ChatModel>) -> ChatSessions {
    let recognizer = IntentRecognizer::new(Arc::clone(&model), registry(db), "intent-test", 0.0);
    let composer = ResponseComposer::new(model, "compose-test", 0.0);
    ChatSessions::new(recognizer, composer, 20)
}
