use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{defaults, models, prompts};
use crate::context::{PromptBuilder, SessionId};
use crate::error::ChatbotError;
use crate::llm::{GeminiClient, ModelClient};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub system_instruction: String,
    pub session_id: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: models::DEFAULT_GEMINI_MODEL.to_string(),
            api_key_env: defaults::API_KEY_ENV.to_string(),
            base_url: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_instruction: prompts::SYSTEM_INSTRUCTION.to_string(),
            session_id: defaults::SESSION_ID.to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatbot")
            .join("config.toml")
    }

    /// Load settings from the default config path, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ChatbotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChatbotError::Configuration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load a `.env` file from the working directory into the process
    /// environment, if one exists.
    pub fn load_dotenv() {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Failed to load .env: {}", e),
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ChatbotError> {
        let name = &self.llm.api_key_env;
        if name.is_empty() {
            return Err(ChatbotError::Configuration(
                "llm.api_key_env is empty".to_string(),
            ));
        }
        match std::env::var(name) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ChatbotError::Configuration(format!(
                "environment variable {name} is not set"
            ))),
        }
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::new(&self.chat.session_id)
    }

    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new().with_system_instruction(&self.chat.system_instruction)
    }

    /// Build the model client. Fails up front when the API key is missing.
    pub fn build_model_client(&self) -> Result<Box<dyn ModelClient>, ChatbotError> {
        let mut client = GeminiClient::new(self.api_key()?)
            .with_model(&self.llm.model)
            .with_timeout(Duration::from_secs(self.llm.timeout_secs));
        if let Some(ref url) = self.llm.base_url {
            client = client.with_base_url(url);
        }
        Ok(Box::new(client))
    }
}
