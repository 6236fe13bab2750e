use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatbotError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited by the model provider: {0}")]
    RateLimit(String),

    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Completion stream cancelled")]
    Cancelled,
}

impl ChatbotError {
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Errors that end a stream but leave the session usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimit(_) | Self::Api { .. } | Self::Cancelled
        )
    }
}

impl From<reqwest::Error> for ChatbotError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatbotError>;
