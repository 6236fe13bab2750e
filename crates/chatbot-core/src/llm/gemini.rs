use crate::constants::{defaults, endpoints, models};
use crate::error::ChatbotError;
use crate::llm::stream::{CompletionStream, StreamEvent};
use crate::llm::traits::*;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Streaming client for Google's Generative Language API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: models::DEFAULT_GEMINI_MODEL.to_string(),
            base_url: endpoints::GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url,
            endpoints::GEMINI_API_VERSION,
            self.model
        )
    }

    fn build_request_body(messages: &[Message]) -> GeminiRequest {
        // Gemini takes the system prompt out of band
        let system_text: String = messages
            .iter()
            .filter(|m| m.role() == Role::System)
            .map(|m| m.content())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role() {
                    Role::User => "user",
                    Role::Assistant => "model",
                    Role::System => return None,
                };
                Some(GeminiContent {
                    role: role.to_string(),
                    parts: vec![GeminiPart {
                        text: m.content().to_string(),
                    }],
                })
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: if system_text.is_empty() {
                None
            } else {
                Some(GeminiSystemInstruction {
                    parts: vec![GeminiPart { text: system_text }],
                })
            },
        }
    }
}

#[async_trait::async_trait]
impl ModelClient for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(
        &self,
        messages: &[Message],
    ) -> Result<CompletionStream, ChatbotError> {
        let request_body = Self::build_request_body(messages);
        tracing::debug!(
            model = %self.model,
            turns = request_body.contents.len(),
            "Starting Gemini stream"
        );

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        let (tx, rx) = mpsc::unbounded();

        let mut body = response.bytes_stream();
        let reader = tokio::spawn(async move {
            use futures::StreamExt;
            let mut decoder = SseDecoder::default();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(StreamEvent::Error(ChatbotError::Transport(
                            e.to_string(),
                        )));
                        return;
                    }
                };

                for data in decoder.push(&chunk) {
                    match parse_event(&data) {
                        Ok(Some(text)) => {
                            if tx.unbounded_send(StreamEvent::TextDelta(text)).is_err() {
                                // Receiver gone, nobody is reading any more
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(ChatbotError::Json(e)) => {
                            tracing::warn!("Skipping malformed Gemini stream event: {}", e);
                        }
                        Err(err) => {
                            let _ = tx.unbounded_send(StreamEvent::Error(err));
                            return;
                        }
                    }
                }
            }

            let _ = tx.unbounded_send(StreamEvent::Done);
        });

        Ok(CompletionStream::new(rx, reader.abort_handle()))
    }
}

/// Map a non-success HTTP status and body onto the error taxonomy.
pub(crate) fn classify_failure(status: u16, body: &str) -> ChatbotError {
    match status {
        401 | 403 => ChatbotError::Authentication(body.to_string()),
        400 if body.contains("API_KEY_INVALID") => ChatbotError::Authentication(body.to_string()),
        429 => ChatbotError::RateLimit(body.to_string()),
        _ if body.contains("RESOURCE_EXHAUSTED") => ChatbotError::RateLimit(body.to_string()),
        _ => ChatbotError::api(status, body),
    }
}

/// Parse one SSE `data:` payload. Returns the text it carries, if any.
pub(crate) fn parse_event(data: &str) -> Result<Option<String>, ChatbotError> {
    let event: GeminiStreamChunk = serde_json::from_str(data)?;

    if let Some(error) = event.error {
        let body = format!("{} ({})", error.message, error.status);
        return Err(classify_failure(error.code, &body));
    }

    let text: String = event
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Splits a byte stream into SSE `data:` payloads. Bytes are buffered until
/// a full line arrives, so characters split across chunks decode intact.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Skipping SSE line with invalid UTF-8: {}", e);
                    continue;
                }
            };

            if let Some(data) = line.trim().strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
        payloads
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}
