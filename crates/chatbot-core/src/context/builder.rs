use crate::constants::prompts;
use crate::context::ConversationHistory;
use crate::llm::Message;

/// Assembles the message sequence sent to the model: system instruction,
/// prior turns in order, then the new user turn.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_instruction: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system_instruction: prompts::SYSTEM_INSTRUCTION.to_string(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn build(&self, history: &ConversationHistory, new_user_text: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.system_instruction));
        messages.extend(history.messages().iter().cloned());
        messages.push(Message::user(new_user_text));
        messages
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `PromptBuilder::default().build(..)`.
pub fn build_messages(history: &ConversationHistory, new_user_text: &str) -> Vec<Message> {
    PromptBuilder::default().build(history, new_user_text)
}
