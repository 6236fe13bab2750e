pub mod chat;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod intent;
pub mod llm;

// Re-export key types
pub use chat::{ChatEvent, ChatOrchestrator, SubmissionOutcome};
pub use config::Settings;
pub use context::{build_messages, ConversationHistory, HistoryStore, PromptBuilder, SessionId};
pub use error::ChatbotError;
pub use intent::is_meta_query;
pub use llm::{CompletionStream, GeminiClient, Message, ModelClient, Role};
