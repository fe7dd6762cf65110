//! Process wiring and the HTTP surface.
//!
//! [`build_state`] opens the database and builds every collaborator once;
//! [`serve`] exposes `handle_message` over HTTP and runs the reminder
//! scheduler alongside it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::agent::{ChatSessions, IntentRecognizer, Reply, ResponseComposer};
use crate::config::MemoConfig;
use crate::db::{self, Database};
use crate::embedding::{self, EmbeddingProvider};
use crate::llm::{self, ChatModel};
use crate::memory::vector::SqliteVectorStore;
use crate::memory::MemoryEngine;
use crate::scheduler::{self, BotNotifier, Notifier};
use crate::search::{self, SearchBackend};
use crate::store::reminders::{self, Reminder, ReminderPatch};
use crate::store::{lists, to_storage_time, users, StoreError};
use crate::tools::reminders::parse_due_date;
use crate::tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: Arc<ChatSessions>,
    pub config: Arc<MemoConfig>,
}

pub fn open_db(config: &MemoConfig) -> Result<Database> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path, config.embedding.dimensions)?;
    tracing::info!(db = %db_path.display(), "database ready");
    Ok(Database::new(conn))
}

/// Record the embedding model on first use; warn when it later changes.
async fn check_embedding_model(db: &Database, configured: String) -> Result<()> {
    db.call(move |conn| {
        match db::migrations::get_embedding_model(conn)? {
            None => db::migrations::set_embedding_model(conn, &configured)?,
            Some(stored) if stored != configured => tracing::warn!(
                stored = %stored,
                configured = %configured,
                "embedding model changed; similarity between old and new memories will be poor"
            ),
            Some(_) => {}
        }
        Ok(())
    })
    .await
}

/// Wire every collaborator from config. The chat model is supplied separately
/// so tests and alternative front-ends can inject their own.
pub fn build_sessions(
    config: &MemoConfig,
    db: Database,
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn ChatModel>,
    search: Arc<dyn SearchBackend>,
) -> ChatSessions {
    let vectors = Arc::new(SqliteVectorStore::new(db.clone()));
    let memory = MemoryEngine::new(embedder, vectors);
    let tools = ToolRegistry::new(db, memory, search, config.search.results_per_query);

    let recognizer = IntentRecognizer::new(
        Arc::clone(&model),
        tools,
        config.llm.intent_model.clone(),
        config.llm.temperature,
    );
    let composer = ResponseComposer::new(model, config.llm.compose_model.clone(), config.llm.temperature);
    ChatSessions::new(recognizer, composer, config.llm.max_history_turns)
}

pub async fn build_state(config: MemoConfig) -> Result<AppState> {
    let db = open_db(&config)?;

    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(embedding::create_provider(&config.embedding)?);
    check_embedding_model(&db, embedder.model_id().to_string()).await?;
    tracing::info!(model = embedder.model_id(), "embedding provider ready");

    let model: Arc<dyn ChatModel> = Arc::from(llm::create_model(&config.llm)?);
    let search: Arc<dyn SearchBackend> = Arc::from(search::create_backend(&config.search)?);

    let sessions = build_sessions(&config, db.clone(), embedder, model, search);
    Ok(AppState {
        db,
        sessions: Arc::new(sessions),
        config: Arc::new(config),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat/message", post(chat_message))
        .route("/bot/message", post(bot_message))
        .route("/auth/web-login", post(web_login))
        .route("/reminders", post(create_reminder).get(list_reminders))
        .route(
            "/reminders/{id}",
            get(read_reminder).put(update_reminder).delete(delete_reminder),
        )
        .with_state(state)
}

/// Serve HTTP until ctrl-c, with the reminder scheduler in the background.
pub async fn serve(config: MemoConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config).await?;

    if state.config.scheduler.enabled {
        match BotNotifier::new(&state.config.notifier) {
            Ok(notifier) => {
                let notifier: Arc<dyn Notifier> = Arc::new(notifier);
                let interval = Duration::from_secs(state.config.scheduler.interval_secs.max(1));
                tokio::spawn(scheduler::run(state.db.clone(), notifier, interval));
            }
            Err(e) => tracing::warn!("reminder scheduler disabled: {e}"),
        }
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {e}");
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

/// Error body `{"detail": ...}` with a status code.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({"detail": self.1}))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!("request failed: {e:#}");
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
    }
}

/// Identifiers arrive as JSON strings or numbers.
fn identifier<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid identifier: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(deserialize_with = "identifier")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BotMessage {
    pub channel_id: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct WebLoginRequest {
    pub access_key: String,
    pub web_token: String,
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn chat_message(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<Reply>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "message must not be empty".into()));
    }
    Ok(Json(state.sessions.handle_message(&body.message, &body.user_id).await))
}

/// Bot-channel entry point: first contact registers the user. `/start` and
/// `/key` are answered here without reaching the model.
async fn bot_message(
    State(state): State<AppState>,
    Json(body): Json<BotMessage>,
) -> Result<Json<Reply>, ApiError> {
    let channel_id = body.channel_id;
    let user = state
        .db
        .call(move |conn| {
            let user = users::get_or_create_channel_user(conn, channel_id)?;
            lists::ensure_lists_exist(conn, user.id)?;
            Ok(user)
        })
        .await?;

    if let Some(text) = bot_command_reply(&body.message, &user.access_key) {
        tracing::info!(user_id = user.id, "bot command answered");
        return Ok(Json(Reply { text }));
    }
    Ok(Json(
        state
            .sessions
            .handle_message(&body.message, &channel_id.to_string())
            .await,
    ))
}

/// Reply for a reserved bot command, or `None` for ordinary messages.
fn bot_command_reply(message: &str, access_key: &str) -> Option<String> {
    let command = message.split_whitespace().next()?;
    // `/start@SomeBot` in group chats
    let command = command.split('@').next().unwrap_or(command);
    match command {
        "/start" => Some(format!(
            "<b>Welcome to MemoGenius!</b>\n\n\
             I'm your personal assistant. I can help you:\n\
             • Create reminders\n\
             • Keep your todo and shopping lists\n\
             • Remember things for you\n\
             • Search information on the web\n\n\
             Your access key for the web interface is:\n<b>{access_key}</b>\n\n\
             <i>Tell me what I can do for you!</i>"
        )),
        "/key" => Some(format!("Your access key is:\n<b>{access_key}</b>")),
        _ => None,
    }
}

async fn web_login(
    State(state): State<AppState>,
    Json(body): Json<WebLoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let linked = state
        .db
        .call(move |conn| Ok(users::link_web_token(conn, &body.access_key, &body.web_token)))
        .await?;
    let user = match linked {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ApiError(StatusCode::NOT_FOUND, "Invalid access key".into())),
        Err(e @ StoreError::InvalidWebToken) => return Err(ApiError(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ StoreError::WebTokenTaken) => return Err(ApiError(StatusCode::CONFLICT, e.to_string())),
        Err(e) => return Err(anyhow::Error::from(e).into()),
    };
    tracing::info!(user_id = user.id, "web token linked");
    Ok(Json(json!({"user_id": user.id, "access_key": user.access_key})))
}

// Reminder CRUD for the web client. The caller is named by `?user_id=`,
// resolved like any other owner identifier.

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub user_id: Option<String>,
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_page_limit")]
    pub limit: u32,
}

fn default_page_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct NewReminder {
    pub text: String,
    pub due_date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReminderChanges {
    pub text: Option<String>,
    pub due_date: Option<String>,
    pub is_active: Option<bool>,
}

async fn request_owner(state: &AppState, user_id: Option<String>) -> Result<i64, ApiError> {
    let Some(identifier) = user_id.filter(|id| !id.trim().is_empty()) else {
        return Err(ApiError(StatusCode::UNAUTHORIZED, "user_id parameter is required".into()));
    };
    state
        .db
        .call(move |conn| Ok(users::resolve_owner(conn, &identifier)?))
        .await?
        .ok_or_else(|| ApiError(StatusCode::UNAUTHORIZED, "User not found".into()))
}

fn storage_due_date(raw: &str) -> Result<String, ApiError> {
    parse_due_date(raw)
        .map(to_storage_time)
        .ok_or_else(|| ApiError(StatusCode::BAD_REQUEST, format!("invalid due_date: {raw}")))
}

fn reminder_not_found() -> ApiError {
    ApiError(StatusCode::NOT_FOUND, "Reminder not found".into())
}

async fn create_reminder(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
    Json(body): Json<NewReminder>,
) -> Result<Json<Reminder>, ApiError> {
    let owner = request_owner(&state, query.user_id).await?;
    if body.text.trim().is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "text must not be empty".into()));
    }
    let due = storage_due_date(&body.due_date)?;
    let reminder = state
        .db
        .call(move |conn| Ok(reminders::create_reminder(conn, owner, body.text.trim(), &due)?))
        .await?;
    tracing::info!(owner, reminder = reminder.id, "reminder created over http");
    Ok(Json(reminder))
}

async fn list_reminders(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    let owner = request_owner(&state, query.user_id).await?;
    let (skip, limit) = (query.skip, query.limit);
    let listed = state
        .db
        .call(move |conn| Ok(reminders::list_reminders(conn, owner, skip, limit)?))
        .await?;
    Ok(Json(listed))
}

async fn read_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Reminder>, ApiError> {
    let owner = request_owner(&state, query.user_id).await?;
    state
        .db
        .call(move |conn| Ok(reminders::get_reminder(conn, owner, id)?))
        .await?
        .map(Json)
        .ok_or_else(reminder_not_found)
}

async fn update_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<OwnerQuery>,
    Json(body): Json<ReminderChanges>,
) -> Result<Json<Reminder>, ApiError> {
    let owner = request_owner(&state, query.user_id).await?;
    let patch = ReminderPatch {
        text: body.text.filter(|t| !t.trim().is_empty()),
        due_date: body.due_date.as_deref().map(storage_due_date).transpose()?,
        is_active: body.is_active,
    };
    state
        .db
        .call(move |conn| Ok(reminders::update_reminder(conn, owner, id, &patch)?))
        .await?
        .map(Json)
        .ok_or_else(reminder_not_found)
}

/// Responds with the reminder as it was before deletion.
async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Reminder>, ApiError> {
    let owner = request_owner(&state, query.user_id).await?;
    state
        .db
        .call(move |conn| {
            let Some(existing) = reminders::get_reminder(conn, owner, id)? else {
                return Ok(None);
            };
            reminders::delete_reminder(conn, owner, id)?;
            Ok(Some(existing))
        })
        .await?
        .map(Json)
        .ok_or_else(reminder_not_found)
}
