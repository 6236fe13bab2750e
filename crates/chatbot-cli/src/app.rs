use crate::render::TerminalRenderer;
use anyhow::Result;
use chatbot_core::{ChatEvent, ChatOrchestrator, SessionId, SubmissionOutcome};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

// ── Single prompt ───────────────────────────────────────────────────────

pub async fn run_single_prompt(
    chat: &ChatOrchestrator,
    session: &SessionId,
    prompt: &str,
) -> Result<()> {
    let mut renderer = TerminalRenderer::new(std::io::stdout()).echo_user(true);
    submit(chat, session, prompt, &mut renderer).await
}

// ── Interactive loop ────────────────────────────────────────────────────

pub async fn run_repl(chat: &ChatOrchestrator, session: &SessionId) -> Result<()> {
    let mut renderer = TerminalRenderer::new(std::io::stdout());
    println!("AI Chatbot ({})", chat.model());
    println!("{}", chat.greeting());
    println!("Type /clear to forget the conversation, /exit to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match line.trim() {
            "/exit" | "/quit" => break,
            "/clear" => {
                chat.clear_history(session).await?;
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        // Ctrl-C drops the submission, which closes the model stream
        tokio::select! {
            result = submit(chat, session, &line, &mut renderer) => result?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted.");
                break;
            }
        }
        println!();
    }

    Ok(())
}

async fn submit<W: Write>(
    chat: &ChatOrchestrator,
    session: &SessionId,
    text: &str,
    renderer: &mut TerminalRenderer<W>,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ChatEvent>();

    let (outcome, rendered) = tokio::join!(
        chat.handle_submission(session, text, event_tx),
        async {
            while let Some(event) = event_rx.recv().await {
                renderer.render(&event)?;
            }
            Ok::<_, std::io::Error>(())
        }
    );
    rendered?;

    let outcome = outcome?;
    tracing::debug!(?outcome, "Submission handled");

    // A rejected key will not fix itself, stop instead of failing every turn
    if let SubmissionOutcome::Truncated { error, .. } = outcome {
        if !error.is_recoverable() {
            return Err(error.into());
        }
    }
    Ok(())
}
