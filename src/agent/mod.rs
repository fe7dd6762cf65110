//! The conversational core: classify a message, run tools, compose a reply.

pub mod composer;
pub mod context;
pub mod intent;
pub mod prompts;
pub mod session;

pub use composer::ResponseComposer;
pub use context::ConversationContext;
pub use intent::{Intent, IntentRecognizer, ToolBundle, TurnOutcome};
pub use session::{ChatSessions, Reply, RESET_COMMAND};
