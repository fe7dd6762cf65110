//! Personal-assistant backend: one conversational entry point over reminders,
//! lists, semantic memory and web search.
//!
//! A message comes in through [`agent::ChatSessions::handle_message`], the
//! intent model picks tools (or answers directly, or asks a question), the
//! tools run against the owner's data, and a second model call composes a
//! single HTML reply.
//!
//! # Architecture
//!
//! - **Storage**: SQLite for users, reminders and lists;
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for memory vectors
//! - **Embeddings**: any OpenAI-compatible `/embeddings` endpoint, or a
//!   deterministic hashed embedder for offline use
//! - **Models**: OpenAI-compatible chat completions with native tool calls
//! - **Transport**: HTTP via axum, plus a terminal chat REPL
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML and environment variables
//! - [`db`]: connection setup, schema, migrations
//! - [`store`]: owner-scoped users, reminders and lists
//! - [`embedding`]: text-to-vector providers
//! - [`memory`]: vector store, ambiguity resolver, store/update/delete/retrieve
//! - [`llm`]: chat model client and provider errors
//! - [`search`]: web search backends
//! - [`tools`]: the tool catalog and executors
//! - [`agent`]: intent recognition, composition, per-owner sessions
//! - [`scheduler`]: due-reminder delivery
//! - [`server`]: process wiring and HTTP routes

pub mod agent;
pub mod config;
pub mod db;
pub mod embedding;
pub mod llm;
pub mod memory;
pub mod scheduler;
pub mod search;
pub mod server;
pub mod store;
pub mod tools;
