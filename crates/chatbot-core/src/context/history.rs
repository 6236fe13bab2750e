use crate::constants::defaults;
use crate::llm::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier of one conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new(defaults::SESSION_ID)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, append-only record of one session's turns.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Per-session histories held in process memory.
#[derive(Debug, Default)]
pub struct HistoryStore {
    sessions: HashMap<SessionId, ConversationHistory>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// History for `session`, or `None` if nothing was recorded yet.
    pub fn get(&self, session: &SessionId) -> Option<&ConversationHistory> {
        self.sessions.get(session)
    }

    /// History for `session`, created empty on first use.
    pub fn session_mut(&mut self, session: &SessionId) -> &mut ConversationHistory {
        self.sessions.entry(session.clone()).or_default()
    }

    pub fn clear(&mut self, session: &SessionId) {
        if let Some(history) = self.sessions.get_mut(session) {
            history.clear();
        }
    }
}
