use crate::error::ChatbotError;
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::AbortHandle;

/// Events sent from a client's reader task to its `CompletionStream`.
#[derive(Debug)]
pub enum StreamEvent {
    TextDelta(String),
    Done,
    Error(ChatbotError),
}

/// A lazy, finite, non-restartable sequence of text increments.
///
/// Yields `Ok(text)` per increment and ends with `None` once the provider
/// reports completion. A failure is yielded once as `Err` and ends the
/// stream. Dropping or cancelling aborts the reader task, which closes the
/// underlying HTTP response.
pub struct CompletionStream {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    reader: Option<AbortHandle>,
    finished: bool,
    cancelled: bool,
}

impl CompletionStream {
    /// Wrap a receiver fed by a spawned reader task.
    pub fn new(rx: mpsc::UnboundedReceiver<StreamEvent>, reader: AbortHandle) -> Self {
        Self {
            rx,
            reader: Some(reader),
            finished: false,
            cancelled: false,
        }
    }

    /// Wrap a receiver that has no reader task behind it.
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<StreamEvent>) -> Self {
        Self {
            rx,
            reader: None,
            finished: false,
            cancelled: false,
        }
    }

    /// A stream that replays the given events in order.
    pub fn from_events(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded();
        for event in events {
            let _ = tx.unbounded_send(event);
        }
        Self::from_receiver(rx)
    }

    /// A stream that yields each chunk and then completes.
    pub fn from_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_events(
            chunks
                .into_iter()
                .map(|c| StreamEvent::TextDelta(c.into()))
                .chain(std::iter::once(StreamEvent::Done)),
        )
    }

    /// Stop the stream and close the network connection behind it.
    /// The next poll yields `ChatbotError::Cancelled` unless the stream
    /// had already finished.
    pub fn cancel(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.rx.close();
        self.cancelled = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        self.reader = None;
    }
}

impl Stream for CompletionStream {
    type Item = Result<String, ChatbotError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if this.cancelled {
            this.finish();
            return Poll::Ready(Some(Err(ChatbotError::Cancelled)));
        }

        match this.rx.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(StreamEvent::TextDelta(text))) => Poll::Ready(Some(Ok(text))),
            Poll::Ready(Some(StreamEvent::Done)) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Ready(Some(StreamEvent::Error(err))) => {
                this.finish();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(Some(Err(ChatbotError::Transport(
                    "completion stream closed before the response finished".into(),
                ))))
            }
        }
    }
}

impl Drop for CompletionStream {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
