//! Microphone capture and audio playback.
//!
//! Voice turns are recorded through a [`Microphone`], which hands out one
//! [`Recording`] per press of the talk control.  Replies that carry audio are
//! handed to an [`AudioPlayer`], which plays them without the caller waiting.
//!
//! The concrete implementations shell out to external programs, by default
//! `ffmpeg` to record and `ffplay` to play.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

use crate::error::{Error, Result};
use crate::observability::{CAPTURE_BYTES, CAPTURES, PLAYBACK_ERRORS, PLAYBACKS};
use crate::types::AudioClip;
use crate::types::audio_clip::VOICE_MIME_TYPE;

/// Default recorder: PulseAudio default source encoded as Opus in WebM on stdout.
const DEFAULT_RECORDER: (&str, &[&str]) = (
    "ffmpeg",
    &[
        "-loglevel", "error", "-f", "pulse", "-i", "default", "-f", "webm", "-c:a", "libopus",
        "pipe:1",
    ],
);

/// Default player: reads one clip from stdin, plays it, and exits.
const DEFAULT_PLAYER: (&str, &[&str]) = (
    "ffplay",
    &["-nodisp", "-autoexit", "-loglevel", "error", "-i", "pipe:0"],
);

/// How long a recorder may take to flush and exit after being asked to stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Written to the recorder's stdin to ask it to stop; ffmpeg's quit key.
const STOP_REQUEST: &[u8] = b"q";

///////////////////////////////////////// ExternalCommand ////////////////////////////////////////

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    /// Create a command from its parts.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The recorder used when none is configured.
    pub fn default_recorder() -> Self {
        Self::from_parts(DEFAULT_RECORDER)
    }

    /// The player used when none is configured.
    pub fn default_player() -> Self {
        Self::from_parts(DEFAULT_PLAYER)
    }

    fn from_parts((program, args): (&str, &[&str])) -> Self {
        Self::new(program, args.iter().map(|arg| arg.to_string()).collect())
    }

    /// Split a command line on whitespace.  Quoting is not supported.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(String::from);
        let Some(program) = words.next() else {
            return Err(Error::configuration("command must not be empty"));
        };
        Ok(Self::new(program, words.collect()))
    }

    /// The program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

//////////////////////////////////////////// Microphone ///////////////////////////////////////////

/// Source of voice recordings.
#[async_trait::async_trait]
pub trait Microphone: Send {
    /// Acquire the input stream and start buffering audio.
    ///
    /// Fails when the device cannot be opened; there is no fallback.
    async fn open(&mut self) -> Result<Box<dyn Recording>>;
}

/// An active capture holding the input stream.
///
/// Dropping a recording without finishing it must release the input stream.
#[async_trait::async_trait]
pub trait Recording: Send {
    /// Stop capturing and join everything buffered so far into one clip.
    async fn finish(self: Box<Self>) -> Result<AudioClip>;
}

/// Records by running an external program that writes encoded audio to stdout.
///
/// Stopping a recording writes `q` to the recorder's stdin and closes it, then
/// waits up to the stop timeout for the recorder to flush and exit.  A
/// recorder still running after that is killed.
#[derive(Debug, Clone)]
pub struct CommandMicrophone {
    command: ExternalCommand,
    stop_timeout: Duration,
}

impl CommandMicrophone {
    /// Record with the given command.
    pub fn new(command: ExternalCommand) -> Self {
        Self {
            command,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Set how long a stopping recorder may take before it is killed.
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// The command used to record.
    pub fn command(&self) -> &ExternalCommand {
        &self.command
    }
}

#[async_trait::async_trait]
impl Microphone for CommandMicrophone {
    async fn open(&mut self) -> Result<Box<dyn Recording>> {
        let mut child = self
            .command
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::microphone(
                    format!("failed to start recorder `{}`: {}", self.command, e),
                    Some(Box::new(e)),
                )
            })?;
        let Some(stdout) = child.stdout.take() else {
            return Err(Error::microphone("recorder has no output stream", None));
        };
        let stdin = child.stdin.take();
        let reader = tokio::spawn(async move {
            let mut fragments = Vec::new();
            let mut stream = ReaderStream::new(stdout);
            while let Some(fragment) = stream.next().await {
                match fragment {
                    Ok(fragment) => fragments.push(fragment),
                    Err(err) => {
                        tracing::warn!(error = %err, "recorder output failed");
                        break;
                    }
                }
            }
            fragments
        });
        tracing::debug!(command = %self.command, "recording started");
        Ok(Box::new(CommandRecording {
            child,
            stdin,
            reader,
            stop_timeout: self.stop_timeout,
        }))
    }
}

struct CommandRecording {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: JoinHandle<Vec<Bytes>>,
    stop_timeout: Duration,
}

impl CommandRecording {
    /// Ask the recorder to stop and wait for it, killing it if it lingers.
    async fn stop(&mut self) -> Result<std::process::ExitStatus> {
        if let Some(mut stdin) = self.stdin.take() {
            // A recorder that ignores stdin may already have closed it.
            if let Err(err) = stdin.write_all(STOP_REQUEST).await {
                tracing::debug!(error = %err, "recorder did not take the stop request");
            }
            drop(stdin);
        }
        let stopped = tokio::time::timeout(self.stop_timeout, self.child.wait()).await;
        match stopped {
            Ok(status) => Ok(status?),
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.stop_timeout,
                    "recorder did not stop in time; killing it"
                );
                if let Err(err) = self.child.start_kill() {
                    tracing::debug!(error = %err, "recorder exited before it could be killed");
                }
                Ok(self.child.wait().await?)
            }
        }
    }
}

#[async_trait::async_trait]
impl Recording for CommandRecording {
    async fn finish(self: Box<Self>) -> Result<AudioClip> {
        let mut this = self;
        let status = this.stop().await?;
        let fragments = (&mut this.reader).await.map_err(|e| {
            Error::microphone(
                format!("recorder output task failed: {}", e),
                Some(Box::new(e)),
            )
        })?;
        let clip = AudioClip::from_fragments(fragments, VOICE_MIME_TYPE);
        if clip.is_empty() {
            return Err(Error::microphone(
                format!("recorder produced no audio ({status})"),
                None,
            ));
        }
        CAPTURES.click();
        CAPTURE_BYTES.count(clip.len() as u64);
        tracing::debug!(bytes = clip.len(), "recording finished");
        Ok(clip)
    }
}

impl Drop for CommandRecording {
    fn drop(&mut self) {
        // kill_on_drop stops the recorder; the reader ends at EOF but may be
        // parked on a pipe another process still holds.
        self.reader.abort();
    }
}

/////////////////////////////////////////// VoiceCapture //////////////////////////////////////////

/// The two states of push-to-talk capture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CaptureState {
    /// Not recording.
    Idle,
    /// The microphone is held and audio is being buffered.
    Capturing,
}

/// Push-to-talk state machine around a [`Microphone`].
pub struct VoiceCapture {
    microphone: Box<dyn Microphone>,
    active: Option<Box<dyn Recording>>,
}

impl VoiceCapture {
    /// Create an idle capture around `microphone`.
    pub fn new(microphone: Box<dyn Microphone>) -> Self {
        Self {
            microphone,
            active: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> CaptureState {
        if self.active.is_some() {
            CaptureState::Capturing
        } else {
            CaptureState::Idle
        }
    }

    /// True while capturing.
    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Idle -> Capturing.
    ///
    /// Returns `Ok(false)` without touching the microphone when already capturing.
    pub async fn press(&mut self) -> Result<bool> {
        if self.active.is_some() {
            return Ok(false);
        }
        let recording = self.microphone.open().await?;
        self.active = Some(recording);
        Ok(true)
    }

    /// Capturing -> Idle, yielding the recorded clip.
    ///
    /// Returns `Ok(None)` when idle.  The state is Idle afterwards even when
    /// finishing the recording fails.
    pub async fn release(&mut self) -> Result<Option<AudioClip>> {
        match self.active.take() {
            Some(recording) => recording.finish().await.map(Some),
            None => Ok(None),
        }
    }

    /// Abandon an active capture, releasing the microphone.
    ///
    /// Returns true if a capture was abandoned.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }
}

impl fmt::Debug for VoiceCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceCapture")
            .field("state", &self.state())
            .finish()
    }
}

//////////////////////////////////////////// AudioPlayer //////////////////////////////////////////

/// Fire-and-forget audio output.
pub trait AudioPlayer: Send + Sync {
    /// Start playing `clip` and return without waiting for playback to end.
    ///
    /// An error means playback could not even be started.
    fn play(&self, clip: AudioClip) -> Result<()>;
}

/// Plays clips by piping them into an external program.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    command: ExternalCommand,
}

impl CommandPlayer {
    /// Play with the given command.
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }

    /// The command used to play.
    pub fn command(&self) -> &ExternalCommand {
        &self.command
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, clip: AudioClip) -> Result<()> {
        let mut child = self
            .command
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                PLAYBACK_ERRORS.click();
                Error::playback(
                    format!("failed to start player `{}`: {}", self.command, e),
                    Some(Box::new(e)),
                )
            })?;
        let Some(mut stdin) = child.stdin.take() else {
            PLAYBACK_ERRORS.click();
            return Err(Error::playback("player has no input stream", None));
        };
        PLAYBACKS.click();
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(clip.data()).await {
                tracing::warn!(error = %err, "failed to feed audio to player");
            }
            drop(stdin);
            match child.wait().await {
                Ok(status) if !status.success() => {
                    tracing::warn!(%status, "player exited unsuccessfully");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "failed to wait for player"),
            }
        });
        Ok(())
    }
}

/// Discards every clip.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

impl AudioPlayer for NullPlayer {
    fn play(&self, clip: AudioClip) -> Result<()> {
        tracing::debug!(bytes = clip.len(), "audio output disabled; dropping clip");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct ScriptedMicrophone {
        opened: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
        fail: bool,
    }

    struct ScriptedRecording {
        released: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Microphone for ScriptedMicrophone {
        async fn open(&mut self) -> Result<Box<dyn Recording>> {
            if self.fail {
                return Err(Error::microphone("permission denied", None));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedRecording {
                released: Arc::clone(&self.released),
            }))
        }
    }

    #[async_trait::async_trait]
    impl Recording for ScriptedRecording {
        async fn finish(self: Box<Self>) -> Result<AudioClip> {
            Ok(AudioClip::new(Bytes::from_static(b"webm"), VOICE_MIME_TYPE))
        }
    }

    impl Drop for ScriptedRecording {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn scripted(fail: bool) -> (VoiceCapture, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let microphone = ScriptedMicrophone {
            opened: Arc::clone(&opened),
            released: Arc::clone(&released),
            fail,
        };
        (VoiceCapture::new(Box::new(microphone)), opened, released)
    }

    #[tokio::test]
    async fn press_and_release_cycle() {
        let (mut capture, opened, released) = scripted(false);
        assert_eq!(capture.state(), CaptureState::Idle);

        assert!(capture.press().await.unwrap());
        assert_eq!(capture.state(), CaptureState::Capturing);

        let clip = capture.release().await.unwrap().unwrap();
        assert_eq!(clip.data().as_ref(), b"webm");
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_press_is_ignored() {
        let (mut capture, opened, _) = scripted(false);
        assert!(capture.press().await.unwrap());
        assert!(!capture.press().await.unwrap());
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_while_idle_yields_nothing() {
        let (mut capture, _, _) = scripted(false);
        assert!(capture.release().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn microphone_failure_propagates() {
        let (mut capture, _, _) = scripted(true);
        let err = capture.press().await.unwrap_err();
        assert!(err.is_microphone());
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn cancel_and_drop_release_the_microphone() {
        let (mut capture, _, released) = scripted(false);
        capture.press().await.unwrap();
        assert!(capture.cancel());
        assert!(!capture.cancel());
        assert_eq!(released.load(Ordering::SeqCst), 1);

        capture.press().await.unwrap();
        drop(capture);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parse_external_command() {
        let command = ExternalCommand::parse("  ffplay -nodisp   -autoexit ").unwrap();
        assert_eq!(command.program(), "ffplay");
        assert_eq!(command.args(), &["-nodisp".to_string(), "-autoexit".to_string()]);
        assert_eq!(command.to_string(), "ffplay -nodisp -autoexit");
        assert!(ExternalCommand::parse("   ").unwrap_err().is_configuration());
    }

    #[test]
    fn default_commands() {
        assert_eq!(
            ExternalCommand::default_recorder().to_string(),
            "ffmpeg -loglevel error -f pulse -i default -f webm -c:a libopus pipe:1"
        );
        assert_eq!(
            ExternalCommand::default_player().to_string(),
            "ffplay -nodisp -autoexit -loglevel error -i pipe:0"
        );
        let recorder = ExternalCommand::default_recorder();
        assert_eq!(
            ExternalCommand::parse(&recorder.to_string()).unwrap(),
            recorder
        );
    }

    #[tokio::test]
    async fn missing_recorder_is_a_microphone_error() {
        let command = ExternalCommand::new("voicehook-no-such-recorder", Vec::new());
        let mut microphone = CommandMicrophone::new(command);
        let err = microphone.open().await.err().unwrap();
        assert!(err.is_microphone());
    }

    fn shell(script: &str) -> ExternalCommand {
        ExternalCommand::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_microphone_buffers_stdout() {
        let mut microphone = CommandMicrophone::new(shell("printf abc; exec sleep 5"))
            .with_stop_timeout(Duration::from_millis(200));
        let recording = microphone.open().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let clip = recording.finish().await.unwrap();
        assert_eq!(clip.data().as_ref(), b"abc");
        assert_eq!(clip.mime_type(), "audio/webm");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stopped_recorder_flushes_its_tail() {
        // Emits the tail only after reading the stop request from stdin.
        let mut microphone = CommandMicrophone::new(shell(
            "printf HEAD; read -r key; printf \"TAIL-$key\"",
        ));
        let recording = microphone.open().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let start = std::time::Instant::now();
        let clip = recording.finish().await.unwrap();
        assert_eq!(clip.data().as_ref(), b"HEADTAIL-q");
        assert!(start.elapsed() < DEFAULT_STOP_TIMEOUT);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recorder_exiting_on_its_own_is_collected() {
        let mut microphone = CommandMicrophone::new(shell("printf done"));
        let recording = microphone.open().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let clip = recording.finish().await.unwrap();
        assert_eq!(clip.data().as_ref(), b"done");
    }

    #[tokio::test]
    async fn missing_player_is_a_playback_error() {
        let player = CommandPlayer::new(ExternalCommand::new("voicehook-no-such-player", vec![]));
        let err = player
            .play(AudioClip::new(Bytes::from_static(b"mp3"), "audio/mpeg"))
            .unwrap_err();
        assert!(matches!(err, Error::Playback { .. }));
    }

    #[test]
    fn null_player_accepts_everything() {
        assert!(
            NullPlayer
                .play(AudioClip::new(Bytes::from_static(b"mp3"), "audio/mpeg"))
                .is_ok()
        );
    }
}
