//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the session
//! identity and the conversation, runs text and voice turns against a
//! [`Transport`], and turns each reply into its effects.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use serde_json::to_writer_pretty;

use crate::audio::{
    AudioPlayer, CommandMicrophone, CommandPlayer, Microphone, NullPlayer, VoiceCapture,
};
use crate::chat::config::ChatConfig;
use crate::chat::render::Renderer;
use crate::client::{Transport, Webhook};
use crate::error::{Error, Result};
use crate::observability::{EMPTY_REPLIES, TEXT_TURNS, TURN_FAILURES, VOICE_TURNS};
use crate::types::{AudioClip, Conversation, MessageRole, SessionId, WebhookReply};

/// User-role entry standing in for a recorded voice message.
pub const VOICE_MESSAGE_TEXT: &str = "🎤 Voice message";

/// Bot-role placeholder for a reply with neither text nor audio.
pub const EMPTY_REPLY_TEXT: &str = "⚠️ Empty AI response";

/// Bot-role placeholder for a turn whose request failed.
pub const SEND_FAILURE_TEXT: &str = "⚠️ Could not reach the AI agent";

/// What a single turn did to the conversation.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The input was blank; nothing was appended and nothing was sent.
    Skipped,

    /// The webhook replied with text, audio, or both.
    Replied {
        /// A bot message was appended.
        text: bool,
        /// Audio was handed to the player.
        audio: bool,
    },

    /// The webhook replied with neither field; the empty placeholder was appended.
    Empty,

    /// The request failed; the failure placeholder was appended.
    Failed(Error),
}

impl TurnOutcome {
    /// True if the turn reached the webhook and got a usable reply.
    pub fn is_replied(&self) -> bool {
        matches!(self, TurnOutcome::Replied { .. })
    }

    /// True if the turn failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, TurnOutcome::Failed(_))
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The session identifier.
    pub session_id: SessionId,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Messages authored by the user.
    pub user_messages: usize,
    /// Messages authored by the bot, placeholders included.
    pub bot_messages: usize,
    /// Text turns sent.
    pub text_turns: u64,
    /// Voice turns sent.
    pub voice_turns: u64,
    /// Turns that failed to get a reply.
    pub failed_turns: u64,
    /// Turns answered with an empty reply.
    pub empty_replies: u64,
    /// Audio replies handed to the player.
    pub audio_replies: u64,
    /// Whether a voice capture is in progress.
    pub recording: bool,
}

/// A chat session that manages conversation state and webhook interactions.
///
/// The session identifier is generated once at construction and sent with
/// every turn.  Turns take `&mut self`, so at most one is in flight and
/// replies are appended in the order the turns were sent.
pub struct ChatSession<T: Transport = Webhook> {
    transport: T,
    session_id: SessionId,
    conversation: Conversation,
    capture: Option<VoiceCapture>,
    player: Box<dyn AudioPlayer>,
    text_turns: u64,
    voice_turns: u64,
    failed_turns: u64,
    empty_replies: u64,
    audio_replies: u64,
}

impl ChatSession<Webhook> {
    /// Creates a session wired to the webhook, recorder, and player in `config`.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let transport = Webhook::with_options(config.webhook_url.clone(), config.timeout)?;
        let player: Box<dyn AudioPlayer> = match &config.play_command {
            Some(command) => Box::new(CommandPlayer::new(command.clone())),
            None => Box::new(NullPlayer),
        };
        let microphone = CommandMicrophone::new(config.record_command.clone());
        Ok(ChatSession::new(transport, player).with_microphone(Box::new(microphone)))
    }
}

impl<T: Transport> ChatSession<T> {
    /// Creates a new session with a fresh identifier and no microphone.
    pub fn new(transport: T, player: Box<dyn AudioPlayer>) -> Self {
        Self::with_session_id(transport, player, SessionId::generate())
    }

    /// Creates a new session with a caller-chosen identifier.
    pub fn with_session_id(
        transport: T,
        player: Box<dyn AudioPlayer>,
        session_id: SessionId,
    ) -> Self {
        Self {
            transport,
            session_id,
            conversation: Conversation::new(),
            capture: None,
            player,
            text_turns: 0,
            voice_turns: 0,
            failed_turns: 0,
            empty_replies: 0,
            audio_replies: 0,
        }
    }

    /// Attaches a microphone for voice turns.
    pub fn with_microphone(mut self, microphone: Box<dyn Microphone>) -> Self {
        self.capture = Some(VoiceCapture::new(microphone));
        self
    }

    /// Returns the session identifier.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a typed message.
    ///
    /// Blank input (after trimming) is ignored: nothing is appended and no
    /// request is made.  Otherwise the untrimmed text is appended as a user
    /// message before the request goes out.
    pub async fn send_text(&mut self, input: &str, renderer: &mut dyn Renderer) -> TurnOutcome {
        if input.trim().is_empty() {
            return TurnOutcome::Skipped;
        }
        TEXT_TURNS.click();
        self.text_turns += 1;
        self.append(input, MessageRole::User, renderer);
        let result = self.transport.send_text(&self.session_id, input).await;
        self.handle_result(result, renderer)
    }

    /// Sends a recorded voice message.
    pub async fn send_voice(&mut self, clip: AudioClip, renderer: &mut dyn Renderer) -> TurnOutcome {
        VOICE_TURNS.click();
        self.voice_turns += 1;
        self.append(VOICE_MESSAGE_TEXT, MessageRole::User, renderer);
        let result = self.transport.send_voice(&self.session_id, &clip).await;
        self.handle_result(result, renderer)
    }

    /// Starts capturing a voice message.
    ///
    /// Returns `Ok(false)` if a capture is already running.  Failing to
    /// acquire the microphone is returned to the caller.
    pub async fn start_recording(&mut self) -> Result<bool> {
        let Some(capture) = self.capture.as_mut() else {
            return Err(Error::microphone("no microphone configured", None));
        };
        capture.press().await
    }

    /// Stops capturing and immediately sends the recording as a voice turn.
    ///
    /// Returns `Ok(None)` if no capture was running.
    pub async fn stop_recording(
        &mut self,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<TurnOutcome>> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };
        match capture.release().await? {
            Some(clip) => Ok(Some(self.send_voice(clip, renderer).await)),
            None => Ok(None),
        }
    }

    /// Abandons a running capture without sending anything.
    pub fn cancel_recording(&mut self) -> bool {
        self.capture.as_mut().is_some_and(VoiceCapture::cancel)
    }

    /// True while a voice capture is running.
    pub fn is_recording(&self) -> bool {
        self.capture.as_ref().is_some_and(VoiceCapture::is_capturing)
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.session_id.clone(),
            message_count: self.conversation.len(),
            user_messages: self.conversation.count_role(MessageRole::User),
            bot_messages: self.conversation.count_role(MessageRole::Bot),
            text_turns: self.text_turns,
            voice_turns: self.voice_turns,
            failed_turns: self.failed_turns,
            empty_replies: self.empty_replies,
            audio_replies: self.audio_replies,
            recording: self.is_recording(),
        }
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile {
            version: 1,
            session_id: &self.session_id,
            messages: &self.conversation,
        };
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    fn append(&mut self, text: &str, role: MessageRole, renderer: &mut dyn Renderer) {
        let message = self.conversation.append(text, role);
        renderer.message_appended(message);
    }

    fn handle_result(
        &mut self,
        result: Result<WebhookReply>,
        renderer: &mut dyn Renderer,
    ) -> TurnOutcome {
        match result {
            Ok(reply) => self.handle_reply(reply, renderer),
            Err(err) => {
                TURN_FAILURES.click();
                self.failed_turns += 1;
                tracing::error!(session = %self.session_id, error = %err, "turn failed");
                self.append(SEND_FAILURE_TEXT, MessageRole::Bot, renderer);
                TurnOutcome::Failed(err)
            }
        }
    }

    fn handle_reply(&mut self, reply: WebhookReply, renderer: &mut dyn Renderer) -> TurnOutcome {
        let text = match reply.output() {
            Some(output) => {
                self.append(output, MessageRole::Bot, renderer);
                true
            }
            None => false,
        };

        let audio = match reply.decode_audio() {
            Some(Ok(clip)) => {
                self.audio_replies += 1;
                match self.player.play(clip.clone()) {
                    Ok(()) => renderer.audio_started(&clip),
                    Err(err) => {
                        tracing::warn!(error = %err, "could not play audio reply");
                        renderer.print_error(&format!("Could not play audio reply: {err}"));
                    }
                }
                true
            }
            Some(Err(err)) => {
                tracing::warn!(error = %err, "audio reply is not valid base64");
                true
            }
            None => false,
        };

        if !text && !audio {
            EMPTY_REPLIES.click();
            self.empty_replies += 1;
            self.append(EMPTY_REPLY_TEXT, MessageRole::Bot, renderer);
            return TurnOutcome::Empty;
        }
        TurnOutcome::Replied { text, audio }
    }
}

#[derive(Serialize)]
struct TranscriptFile<'a> {
    version: u8,
    session_id: &'a SessionId,
    messages: &'a Conversation,
}
