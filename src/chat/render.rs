//! Output rendering for the chat application.
//!
//! The renderer is the presentation collaborator of a chat session: it is
//! told about every message appended to the conversation, and about audio
//! replies as they start playing.

use std::io::{self, Stdout, Write};

use crate::types::{AudioClip, Message, MessageRole};

/// ANSI escape code for dim text (used for info lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for role labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for blue text (used for the user).
const ANSI_BLUE: &str = "\x1b[34m";

/// ANSI escape code for cyan text (used for the bot).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// `message_appended` is the observer hook: a session calls it exactly once
/// for every message it appends, in append order.
pub trait Renderer: Send {
    /// A message was appended to the conversation.
    fn message_appended(&mut self, message: &Message);

    /// An audio reply started playing.
    fn audio_started(&mut self, clip: &AudioClip);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Returns the display label for a role.
pub fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "You",
        MessageRole::Bot => "Bot",
    }
}

/// Formats one message as a single display line.
pub fn format_message(message: &Message, use_color: bool) -> String {
    let label = role_label(message.role());
    if use_color {
        let color = match message.role() {
            MessageRole::User => ANSI_BLUE,
            MessageRole::Bot => ANSI_CYAN,
        };
        format!(
            "{ANSI_BOLD}{color}{label}:{ANSI_RESET} {}",
            message.text()
        )
    } else {
        format!("{label}: {}", message.text())
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Prints every message of a conversation, oldest first.
    pub fn print_history<'a>(&mut self, messages: impl IntoIterator<Item = &'a Message>) {
        for message in messages {
            self.message_appended(message);
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn message_appended(&mut self, message: &Message) {
        println!("{}", format_message(message, self.use_color));
        self.flush();
    }

    fn audio_started(&mut self, clip: &AudioClip) {
        self.print_info(&format!("[playing {} bytes of {}]", clip.len(), clip.mime_type()));
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn plain_formatting_labels_roles() {
        assert_eq!(format_message(&Message::user("hi"), false), "You: hi");
        assert_eq!(format_message(&Message::bot("hello"), false), "Bot: hello");
    }

    #[test]
    fn colored_formatting_wraps_label() {
        let line = format_message(&Message::bot("hello"), true);
        assert!(line.starts_with(ANSI_BOLD));
        assert!(line.contains("Bot:"));
        assert!(line.ends_with(" hello"));
    }
}
