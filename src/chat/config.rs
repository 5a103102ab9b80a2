//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::env;
use std::time::Duration;

use arrrg_derive::CommandLine;
use url::Url;

use crate::audio::ExternalCommand;
use crate::error::{Error, Result};

/// Environment variable consulted when no webhook URL is given on the command line.
pub const WEBHOOK_URL_ENV: &str = "VOICEHOOK_WEBHOOK_URL";

/// Command-line arguments for the voicehook-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Webhook every turn is posted to.
    #[arrrg(optional, "Webhook URL (default: $VOICEHOOK_WEBHOOK_URL)", "URL")]
    pub webhook_url: Option<String>,

    /// Per-request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Recorder command line.
    #[arrrg(optional, "Command that writes recorded WebM audio to stdout", "COMMAND")]
    pub record_command: Option<String>,

    /// Player command line.
    #[arrrg(optional, "Command that plays audio read from stdin", "COMMAND")]
    pub play_command: Option<String>,

    /// Disable audio replies.
    #[arrrg(flag, "Do not play audio replies")]
    pub no_audio: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The endpoint every turn is posted to.
    pub webhook_url: Url,

    /// Optional per-request timeout.  `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// Command used to record voice messages.
    pub record_command: ExternalCommand,

    /// Command used to play audio replies.  `None` disables playback.
    pub play_command: Option<ExternalCommand>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig for `webhook_url` with default values.
    ///
    /// Defaults:
    /// - Timeout: none
    /// - Recorder: ffmpeg capturing the default PulseAudio source
    /// - Player: ffplay
    /// - Color: enabled
    pub fn new(webhook_url: Url) -> Self {
        Self {
            webhook_url,
            timeout: None,
            record_command: ExternalCommand::default_recorder(),
            play_command: Some(ExternalCommand::default_player()),
            use_color: true,
        }
    }

    /// Resolves arguments, using `fallback_url` when no URL was passed.
    pub fn from_args(args: ChatArgs, fallback_url: Option<String>) -> Result<Self> {
        let Some(raw_url) = args.webhook_url.or(fallback_url) else {
            return Err(Error::configuration(format!(
                "no webhook URL: pass --webhook-url or set {WEBHOOK_URL_ENV}"
            )));
        };
        let webhook_url = parse_webhook_url(&raw_url)?;

        let mut config = ChatConfig::new(webhook_url);
        if let Some(secs) = args.timeout_secs {
            if secs == 0 {
                return Err(Error::configuration("--timeout-secs must be positive"));
            }
            config = config.with_timeout(Some(Duration::from_secs(secs)));
        }
        if let Some(record) = args.record_command {
            config = config.with_record_command(ExternalCommand::parse(&record)?);
        }
        if let Some(play) = args.play_command {
            config = config.with_play_command(ExternalCommand::parse(&play)?);
        }
        if args.no_audio {
            config = config.without_audio();
        }
        if args.no_color {
            config = config.without_color();
        }
        Ok(config)
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the recorder command.
    pub fn with_record_command(mut self, command: ExternalCommand) -> Self {
        self.record_command = command;
        self
    }

    /// Sets the player command and enables playback.
    pub fn with_play_command(mut self, command: ExternalCommand) -> Self {
        self.play_command = Some(command);
        self
    }

    /// Disables audio playback.
    pub fn without_audio(mut self) -> Self {
        self.play_command = None;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        ChatConfig::from_args(args, env::var(WEBHOOK_URL_ENV).ok())
    }
}

/// Parses and checks a webhook URL.  Only http and https are accepted.
pub fn parse_webhook_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::configuration(format!(
            "webhook URL must use http or https, not {other}"
        ))),
    }
}
