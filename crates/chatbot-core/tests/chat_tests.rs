use chatbot_core::constants::prompts;
use chatbot_core::llm::StreamEvent;
use chatbot_core::{
    ChatEvent, ChatOrchestrator, ChatbotError, CompletionStream, Message, ModelClient, Role,
    SessionId, SubmissionOutcome,
};
use futures::channel::mpsc::unbounded;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Mock model client that hands out pre-programmed streams and records
/// every message sequence it was called with.
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<CompletionStream, ChatbotError>>>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<CompletionStream, ChatbotError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn chunks(chunks: &[&str]) -> Self {
        Self::new(vec![Ok(CompletionStream::from_chunks(chunks.to_vec()))])
    }

    fn calls(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedClient {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn stream_completion(
        &self,
        messages: &[Message],
    ) -> Result<CompletionStream, ChatbotError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatbotError::Transport("no scripted reply left".into())))
    }
}

fn drain(rx: &mut UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_empty_input_warns_without_touching_history() {
    let client = ScriptedClient::new(vec![]);
    let calls = client.calls();
    let chat = ChatOrchestrator::new(Box::new(client));
    let session = SessionId::default();

    for input in ["", "   ", "\n\t"] {
        let (tx, mut rx) = unbounded_channel();
        let outcome = chat.handle_submission(&session, input, tx).await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::EmptyInput));
        assert_eq!(
            drain(&mut rx),
            vec![ChatEvent::Warning(prompts::EMPTY_INPUT_WARNING.to_string())]
        );
    }

    assert!(chat.history(&session).await.is_empty());
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_successful_submission_appends_two_turns() {
    let client = ScriptedClient::chunks(&["2+2 ", "is ", "4."]);
    let chat = ChatOrchestrator::new(Box::new(client));
    let session = SessionId::default();
    let (tx, mut rx) = unbounded_channel();

    let outcome = chat.handle_submission(&session, "2+2?", tx).await.unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Completed(ref text) if text == "2+2 is 4."));
    assert_eq!(outcome.text(), Some("2+2 is 4."));

    let history = chat.history(&session).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], Message::user("2+2?"));
    assert_eq!(history[1], Message::assistant("2+2 is 4."));

    let events = drain(&mut rx);
    assert_eq!(events[0], ChatEvent::UserMessage("2+2?".into()));
    assert_eq!(events[1], ChatEvent::AssistantStarted);
    assert_eq!(
        events[2],
        ChatEvent::AssistantDelta {
            delta: "2+2 ".into(),
            buffer: "2+2 ".into()
        }
    );
    assert_eq!(
        events[4],
        ChatEvent::AssistantDelta {
            delta: "4.".into(),
            buffer: "2+2 is 4.".into()
        }
    );
    assert_eq!(events[5], ChatEvent::AssistantMessage("2+2 is 4.".into()));
    assert_eq!(events.len(), 6);
}

#[tokio::test]
async fn test_prompt_contains_prior_turns_and_new_text_once() {
    let client = ScriptedClient::new(vec![
        Ok(CompletionStream::from_chunks(["Paris"])),
        Ok(CompletionStream::from_chunks(["About 2.1 million"])),
    ]);
    let calls = client.calls();
    let chat = ChatOrchestrator::new(Box::new(client));
    let session = SessionId::default();

    chat.handle_submission(&session, "Capital of France?", unbounded_channel().0)
        .await
        .unwrap();
    chat.handle_submission(&session, "Population?", unbounded_channel().0)
        .await
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        vec![
            Message::system(prompts::SYSTEM_INSTRUCTION),
            Message::user("Capital of France?"),
        ]
    );
    assert_eq!(
        calls[1],
        vec![
            Message::system(prompts::SYSTEM_INSTRUCTION),
            Message::user("Capital of France?"),
            Message::assistant("Paris"),
            Message::user("Population?"),
        ]
    );
    assert_eq!(chat.history(&session).await.len(), 4);
}

#[tokio::test]
async fn test_meta_question_never_calls_model() {
    let client = ScriptedClient::new(vec![]);
    let calls = client.calls();
    let chat = ChatOrchestrator::new(Box::new(client));
    let session = SessionId::default();
    let (tx, mut rx) = unbounded_channel();

    let outcome = chat
        .handle_submission(&session, "Who built you?", tx)
        .await
        .unwrap();

    assert!(matches!(outcome, SubmissionOutcome::FixedAnswer(ref t) if t == prompts::ATTRIBUTION));
    assert!(calls.lock().unwrap().is_empty());

    let history = chat.history(&session).await;
    assert_eq!(
        history,
        vec![
            Message::user("Who built you?"),
            Message::assistant(prompts::ATTRIBUTION),
        ]
    );
    assert_eq!(
        drain(&mut rx),
        vec![
            ChatEvent::UserMessage("Who built you?".into()),
            ChatEvent::AssistantMessage(prompts::ATTRIBUTION.into()),
        ]
    );
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_partial_text() {
    let stream = CompletionStream::from_events([
        StreamEvent::TextDelta("The answer ".into()),
        StreamEvent::TextDelta("is".into()),
        StreamEvent::Error(ChatbotError::Transport("connection reset".into())),
    ]);
    let chat = ChatOrchestrator::new(Box::new(ScriptedClient::new(vec![Ok(stream)])));
    let session = SessionId::default();
    let (tx, mut rx) = unbounded_channel();

    let outcome = chat
        .handle_submission(&session, "What is the answer?", tx)
        .await
        .unwrap();

    match outcome {
        SubmissionOutcome::Truncated { text, error } => {
            assert_eq!(text, "The answer is");
            assert!(matches!(error, ChatbotError::Transport(_)));
        }
        other => panic!("expected truncation, got {other:?}"),
    }

    let history = chat.history(&session).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], Message::assistant("The answer is"));

    let events = drain(&mut rx);
    assert!(events.contains(&ChatEvent::AssistantMessage("The answer is".into())));
    assert!(matches!(events.last(), Some(ChatEvent::Error(_))));
}

#[tokio::test]
async fn test_rate_limit_is_surfaced_as_visible_error() {
    let chat = ChatOrchestrator::new(Box::new(ScriptedClient::new(vec![Err(
        ChatbotError::RateLimit("quota".into()),
    )])));
    let session = SessionId::default();
    let (tx, mut rx) = unbounded_channel();

    let outcome = chat.handle_submission(&session, "hello", tx).await.unwrap();
    assert!(matches!(
        outcome,
        SubmissionOutcome::Truncated {
            error: ChatbotError::RateLimit(_),
            ..
        }
    ));

    // request rejected before any text: only the user turn is recorded
    let history = chat.history(&session).await;
    assert_eq!(history, vec![Message::user("hello")]);

    let events = drain(&mut rx);
    assert_eq!(events[0], ChatEvent::UserMessage("hello".into()));
    match &events[1] {
        ChatEvent::Error(text) => assert!(text.contains("rate limiting")),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_submission_is_rejected() {
    let (stream_tx, stream_rx) = unbounded();
    let client = ScriptedClient::new(vec![Ok(CompletionStream::from_receiver(stream_rx))]);
    let calls = client.calls();
    let chat = Arc::new(ChatOrchestrator::new(Box::new(client)));
    let session = SessionId::default();

    let first = tokio::spawn({
        let chat = chat.clone();
        let session = session.clone();
        async move {
            chat.handle_submission(&session, "slow question", unbounded_channel().0)
                .await
        }
    });

    while calls.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }
    assert!(chat.is_busy());

    let second = chat
        .handle_submission(&session, "impatient question", unbounded_channel().0)
        .await;
    assert!(matches!(second, Err(ChatbotError::SubmissionInFlight)));
    assert!(matches!(
        chat.clear_history(&session).await,
        Err(ChatbotError::SubmissionInFlight)
    ));

    stream_tx
        .unbounded_send(StreamEvent::TextDelta("done".into()))
        .unwrap();
    stream_tx.unbounded_send(StreamEvent::Done).unwrap();

    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.text(), Some("done"));
    assert!(!chat.is_busy());

    let history = chat.history(&session).await;
    assert_eq!(
        history,
        vec![Message::user("slow question"), Message::assistant("done")]
    );
}

#[tokio::test]
async fn test_dropped_renderer_cancels_stream() {
    let (stream_tx, stream_rx) = unbounded();
    stream_tx
        .unbounded_send(StreamEvent::TextDelta("first".into()))
        .unwrap();
    let chat = ChatOrchestrator::new(Box::new(ScriptedClient::new(vec![Ok(
        CompletionStream::from_receiver(stream_rx),
    )])));
    let session = SessionId::default();

    let (tx, rx) = unbounded_channel();
    drop(rx);

    // The stream never sends Done; cancellation is what ends the submission.
    let outcome = chat.handle_submission(&session, "anyone?", tx).await.unwrap();
    match outcome {
        SubmissionOutcome::Truncated { text, error } => {
            assert_eq!(text, "first");
            assert!(matches!(error, ChatbotError::Cancelled));
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(chat.history(&session).await[1].role(), Role::Assistant);
    drop(stream_tx);
}

#[tokio::test]
async fn test_sessions_do_not_share_history() {
    let client = ScriptedClient::new(vec![
        Ok(CompletionStream::from_chunks(["one"])),
        Ok(CompletionStream::from_chunks(["two"])),
    ]);
    let calls = client.calls();
    let chat = ChatOrchestrator::new(Box::new(client));
    let a = SessionId::new("a");
    let b = SessionId::new("b");

    chat.handle_submission(&a, "hi from a", unbounded_channel().0)
        .await
        .unwrap();
    chat.handle_submission(&b, "hi from b", unbounded_channel().0)
        .await
        .unwrap();

    assert_eq!(calls.lock().unwrap()[1].len(), 2);
    assert_eq!(chat.history(&a).await.len(), 2);
    assert_eq!(chat.history(&b).await.len(), 2);

    chat.clear_history(&a).await.unwrap();
    assert!(chat.history(&a).await.is_empty());
    assert_eq!(chat.history(&b).await.len(), 2);
}

#[tokio::test]
async fn test_empty_completion_still_records_assistant_turn() {
    let chat = ChatOrchestrator::new(Box::new(ScriptedClient::new(vec![Ok(
        CompletionStream::from_chunks(Vec::<String>::new()),
    )])));
    let session = SessionId::default();

    let outcome = chat
        .handle_submission(&session, "say nothing", unbounded_channel().0)
        .await
        .unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Completed(ref t) if t.is_empty()));
    assert_eq!(chat.history(&session).await.len(), 2);
}

#[tokio::test]
async fn test_greeting_and_model() {
    let chat = ChatOrchestrator::new(Box::new(ScriptedClient::new(vec![])));
    assert_eq!(chat.greeting(), prompts::GREETING);
    assert_eq!(chat.model(), "scripted");
}

#[tokio::test]
async fn test_empty_input_while_streaming_still_warns() {
    let (stream_tx, stream_rx) = unbounded();
    let client = ScriptedClient::new(vec![Ok(CompletionStream::from_receiver(stream_rx))]);
    let calls = client.calls();
    let chat = Arc::new(ChatOrchestrator::new(Box::new(client)));
    let session = SessionId::default();

    let first = tokio::spawn({
        let chat = chat.clone();
        let session = session.clone();
        async move {
            chat.handle_submission(&session, "long answer please", unbounded_channel().0)
                .await
        }
    });

    while calls.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }
    assert!(chat.is_busy());

    let (tx, mut rx) = unbounded_channel();
    let outcome = chat.handle_submission(&session, "  ", tx).await.unwrap();
    assert!(matches!(outcome, SubmissionOutcome::EmptyInput));
    assert_eq!(
        drain(&mut rx),
        vec![ChatEvent::Warning(prompts::EMPTY_INPUT_WARNING.to_string())]
    );
    assert!(chat.is_busy());

    stream_tx.unbounded_send(StreamEvent::Done).unwrap();
    first.await.unwrap().unwrap();
    assert_eq!(chat.history(&session).await.len(), 2);
}

#[tokio::test]
async fn test_failure_before_first_increment_records_user_turn_only() {
    let stream = CompletionStream::from_events([StreamEvent::Error(ChatbotError::Transport(
        "connection refused".into(),
    ))]);
    let chat = ChatOrchestrator::new(Box::new(ScriptedClient::new(vec![Ok(stream)])));
    let session = SessionId::default();
    let (tx, mut rx) = unbounded_channel();

    let outcome = chat.handle_submission(&session, "hello?", tx).await.unwrap();
    match outcome {
        SubmissionOutcome::Truncated { text, error } => {
            assert!(text.is_empty());
            assert!(matches!(error, ChatbotError::Transport(_)));
        }
        other => panic!("expected truncation, got {other:?}"),
    }

    assert_eq!(chat.history(&session).await, vec![Message::user("hello?")]);
    let events = drain(&mut rx);
    assert!(events.contains(&ChatEvent::AssistantMessage(String::new())));
    assert!(matches!(events.last(), Some(ChatEvent::Error(_))));
}
