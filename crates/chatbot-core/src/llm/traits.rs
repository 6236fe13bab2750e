use crate::error::ChatbotError;
use crate::llm::CompletionStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation. Fields are private so a turn cannot be
/// edited after it has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The model client trait. Implementations stream a completion for an
/// already assembled message sequence and never retry on their own.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Start a streaming completion.
    ///
    /// Errors returned here mean the request was rejected before any text
    /// was produced. Failures after that arrive as `Err` items on the stream.
    async fn stream_completion(
        &self,
        messages: &[Message],
    ) -> Result<CompletionStream, ChatbotError>;
}
