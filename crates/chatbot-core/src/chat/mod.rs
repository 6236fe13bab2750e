mod orchestrator;

pub use orchestrator::{ChatEvent, ChatOrchestrator, SubmissionOutcome};
