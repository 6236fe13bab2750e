mod gemini;
mod stream;
mod traits;

pub use gemini::GeminiClient;
pub use stream::{CompletionStream, StreamEvent};
pub use traits::*;
