/// Chatbot centralized constants.
/// Model names, endpoints, and the fixed texts shown to the user live here.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const GEMINI_API_VERSION: &str = "v1beta";
}

// ─── Default Settings ─────────────────────────────────────────────────────────

pub mod defaults {
    pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
    /// All submissions in one process share this session.
    pub const SESSION_ID: &str = "any";
}

// ─── Fixed Texts ──────────────────────────────────────────────────────────────

pub mod prompts {
    pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant. Please respond to user queries in English, but understand the questions in English.";

    pub const ATTRIBUTION: &str = "I was created by Yahya Khan Shigri. You can find him at www.linkedin.com/in/yahya-khan-shigri.";

    pub const GREETING: &str = "Hello! I'm your AI assistant. I can help answer questions about technology, education, and general knowledge. How can I assist you today?";

    pub const EMPTY_INPUT_WARNING: &str = "Please enter your question.";
}
