mod builder;
mod history;

pub use builder::{build_messages, PromptBuilder};
pub use history::{ConversationHistory, HistoryStore, SessionId};
