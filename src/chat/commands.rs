//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the webhook.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start recording a voice message.  The next line of input stops it.
    Voice,

    /// Show the session identifier.
    Session,

    /// Print the conversation so far.
    History,

    /// Save the transcript to a specific file immediately.
    SaveTranscript(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use voicehook::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/save chat.json").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "voice" | "mic" | "v" => ChatCommand::Voice,
        "session" => ChatCommand::Session,
        "history" => ChatCommand::History,
        "save" => match argument {
            Some(arg) => ChatCommand::SaveTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Notice for a line entered while recording.
///
/// Enter stops the recording no matter what was typed, so anything on the line
/// is dropped.  Returns `None` for a bare Enter.
pub fn ignored_while_recording(line: &str) -> Option<String> {
    let typed = line.trim();
    if typed.is_empty() {
        return None;
    }
    Some(format!("Ignored \"{typed}\": input is not sent while recording"))
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /voice                 Record a voice message (Enter sends, Ctrl+C cancels)
  /session               Show the session identifier
  /history               Print the conversation so far
  /save <file>           Save the current transcript immediately
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
