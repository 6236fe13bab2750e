use chatbot_core::ChatEvent;
use std::io::{self, Write};

/// Shown after the partial answer while it is still streaming.
const CURSOR: char = '|';
const ERASE_CURSOR: &str = "\x08 \x08";

/// Writes chat events to a terminal. Streamed text is printed as it
/// arrives followed by a cursor marker, which is erased once the answer
/// settles.
pub struct TerminalRenderer<W: Write> {
    out: W,
    echo_user: bool,
    streaming: bool,
    cursor_shown: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            echo_user: false,
            streaming: false,
            cursor_shown: false,
        }
    }

    /// Print the user's own text back. Off for the interactive loop, where
    /// the typed line is already on screen.
    pub fn echo_user(mut self, echo: bool) -> Self {
        self.echo_user = echo;
        self
    }

    pub fn render(&mut self, event: &ChatEvent) -> io::Result<()> {
        match event {
            ChatEvent::Warning(text) => writeln!(self.out, "warning: {text}")?,
            ChatEvent::UserMessage(text) => {
                if self.echo_user {
                    writeln!(self.out, "you> {text}")?;
                }
            }
            ChatEvent::AssistantStarted => {
                self.streaming = true;
                write!(self.out, "assistant> ")?;
            }
            ChatEvent::AssistantDelta { delta, .. } => {
                self.erase_cursor()?;
                write!(self.out, "{delta}{CURSOR}")?;
                self.cursor_shown = true;
            }
            ChatEvent::AssistantMessage(text) => {
                if self.streaming {
                    self.erase_cursor()?;
                    writeln!(self.out)?;
                } else {
                    writeln!(self.out, "assistant> {text}")?;
                }
                self.streaming = false;
            }
            ChatEvent::Error(text) => writeln!(self.out, "error: {text}")?,
        }
        self.out.flush()
    }

    fn erase_cursor(&mut self) -> io::Result<()> {
        if self.cursor_shown {
            self.out.write_all(ERASE_CURSOR.as_bytes())?;
            self.cursor_shown = false;
        }
        Ok(())
    }
}
