//! Chat application module for conversations with a webhook-backed agent.
//!
//! This module provides a REPL chat interface built on top of the voicehook
//! client library. It supports:
//!
//! - Typed text turns
//! - Push-to-talk voice turns
//! - Playback of audio replies
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Conversation state and turn handling
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, ignored_while_recording, parse_command};
pub use config::{ChatArgs, ChatConfig, WEBHOOK_URL_ENV, parse_webhook_url};
pub use render::{PlainTextRenderer, Renderer, format_message, role_label};
pub use session::{
    ChatSession, EMPTY_REPLY_TEXT, SEND_FAILURE_TEXT, SessionStats, TurnOutcome,
    VOICE_MESSAGE_TEXT,
};
