use anyhow::Result;
use chatbot_core::{ChatOrchestrator, SessionId, Settings};
use clap::Parser;

mod app;
mod render;

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(about = "AI Chatbot - ask a question, get a streamed answer")]
#[command(version)]
struct Cli {
    /// Ask a single question and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Session identifier the conversation is recorded under
    #[arg(long)]
    session: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    Settings::load_dotenv();
    let mut settings = Settings::load();

    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }
    let session = match cli.session {
        Some(id) => SessionId::new(id),
        None => settings.session_id(),
    };

    // Missing API key is fatal here, before any input is read
    let client = settings.build_model_client()?;
    let chat = ChatOrchestrator::new(client).with_prompt_builder(settings.prompt_builder());

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(&chat, &session, &prompt).await?;
    } else {
        app::run_repl(&chat, &session).await?;
    }

    Ok(())
}
