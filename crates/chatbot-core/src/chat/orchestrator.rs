use crate::constants::prompts;
use crate::context::{HistoryStore, PromptBuilder, SessionId};
use crate::error::ChatbotError;
use crate::intent::is_meta_query;
use crate::llm::{Message, ModelClient};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

/// Events emitted while a submission is handled, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Input was rejected before anything was recorded.
    Warning(String),
    UserMessage(String),
    /// The model call was accepted and text is about to arrive.
    AssistantStarted,
    /// One increment arrived. `buffer` is everything received so far.
    AssistantDelta { delta: String, buffer: String },
    /// Final assistant text, complete or truncated.
    AssistantMessage(String),
    Error(String),
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    EmptyInput,
    FixedAnswer(String),
    Completed(String),
    /// The model call failed. `text` is what arrived before the failure.
    Truncated { text: String, error: ChatbotError },
}

impl SubmissionOutcome {
    /// Assistant text produced by the submission, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::EmptyInput => None,
            Self::FixedAnswer(text) | Self::Completed(text) => Some(text.as_str()),
            Self::Truncated { text, .. } => Some(text.as_str()),
        }
    }
}

/// Routes each submission either to the fixed attribution answer or
/// through the prompt builder and model client, and is the only writer of
/// the history store.
///
/// One submission runs at a time; a second one arriving while a stream is
/// in flight is rejected with `ChatbotError::SubmissionInFlight`.
pub struct ChatOrchestrator {
    client: Box<dyn ModelClient>,
    prompt_builder: PromptBuilder,
    history: Mutex<HistoryStore>,
    in_flight: AtomicBool,
}

impl ChatOrchestrator {
    pub fn new(client: Box<dyn ModelClient>) -> Self {
        Self {
            client,
            prompt_builder: PromptBuilder::default(),
            history: Mutex::new(HistoryStore::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.prompt_builder = builder;
        self
    }

    pub fn greeting(&self) -> &'static str {
        prompts::GREETING
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Handle one user submission, emitting events through `event_tx`.
    ///
    /// Empty input only produces a warning, even while another submission
    /// is streaming. When the model call fails, the text received so far is
    /// appended as the assistant turn. If nothing arrived before the failure
    /// no assistant turn is appended, so history grows by the user turn
    /// alone; the API rejects empty model turns on later requests.
    pub async fn handle_submission(
        &self,
        session_id: &SessionId,
        user_text: &str,
        event_tx: UnboundedSender<ChatEvent>,
    ) -> Result<SubmissionOutcome, ChatbotError> {
        if user_text.trim().is_empty() {
            let _ = event_tx.send(ChatEvent::Warning(prompts::EMPTY_INPUT_WARNING.to_string()));
            return Ok(SubmissionOutcome::EmptyInput);
        }

        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        if is_meta_query(user_text) {
            tracing::info!(session = %session_id, "Answering meta-question with fixed attribution");
            {
                let mut store = self.history.lock().await;
                let history = store.session_mut(session_id);
                history.add_user_message(user_text);
                history.add_assistant_message(prompts::ATTRIBUTION);
            }
            let _ = event_tx.send(ChatEvent::UserMessage(user_text.to_string()));
            let _ = event_tx.send(ChatEvent::AssistantMessage(prompts::ATTRIBUTION.to_string()));
            return Ok(SubmissionOutcome::FixedAnswer(prompts::ATTRIBUTION.to_string()));
        }

        // Build from the history as it was before this turn, then record the
        // user turn so it shows up before the model answers.
        let messages = {
            let mut store = self.history.lock().await;
            let history = store.session_mut(session_id);
            let messages = self.prompt_builder.build(history, user_text);
            history.add_user_message(user_text);
            messages
        };
        let _ = event_tx.send(ChatEvent::UserMessage(user_text.to_string()));

        tracing::info!(
            session = %session_id,
            model = %self.client.model(),
            turns = messages.len(),
            "Streaming completion"
        );

        let mut stream = match self.client.stream_completion(&messages).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(session = %session_id, "Model request failed: {}", err);
                let _ = event_tx.send(ChatEvent::Error(describe_failure(&err)));
                return Ok(SubmissionOutcome::Truncated {
                    text: String::new(),
                    error: err,
                });
            }
        };
        let _ = event_tx.send(ChatEvent::AssistantStarted);

        let mut buffer = String::new();
        let mut failure = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => {
                    buffer.push_str(&delta);
                    let event = ChatEvent::AssistantDelta {
                        delta,
                        buffer: buffer.clone(),
                    };
                    if event_tx.send(event).is_err() {
                        // Nobody is rendering any more
                        stream.cancel();
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        // A failed stream keeps whatever text arrived before the failure.
        if failure.is_none() || !buffer.is_empty() {
            let mut store = self.history.lock().await;
            store.session_mut(session_id).add_assistant_message(&buffer);
        }
        let _ = event_tx.send(ChatEvent::AssistantMessage(buffer.clone()));

        match failure {
            None => {
                tracing::debug!(session = %session_id, chars = buffer.len(), "Completion finished");
                Ok(SubmissionOutcome::Completed(buffer))
            }
            Some(err) => {
                tracing::warn!(
                    session = %session_id,
                    chars = buffer.len(),
                    "Completion truncated: {}",
                    err
                );
                let _ = event_tx.send(ChatEvent::Error(describe_failure(&err)));
                Ok(SubmissionOutcome::Truncated {
                    text: buffer,
                    error: err,
                })
            }
        }
    }

    /// All turns recorded for `session_id`, oldest first.
    pub async fn history(&self, session_id: &SessionId) -> Vec<Message> {
        let store = self.history.lock().await;
        store
            .get(session_id)
            .map(|h| h.messages().to_vec())
            .unwrap_or_default()
    }

    pub async fn clear_history(&self, session_id: &SessionId) -> Result<(), ChatbotError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        self.history.lock().await.clear(session_id);
        Ok(())
    }
}

/// Text shown to the user when a model call fails.
fn describe_failure(err: &ChatbotError) -> String {
    match err {
        ChatbotError::RateLimit(_) => {
            "The model provider is rate limiting requests. Please wait a moment and try again."
                .to_string()
        }
        ChatbotError::Authentication(_) | ChatbotError::Configuration(_) => {
            format!("The model provider rejected the API key: {err}")
        }
        ChatbotError::Cancelled => "The response was cancelled.".to_string(),
        _ => format!("The response was interrupted: {err}"),
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ChatbotError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChatbotError::SubmissionInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
