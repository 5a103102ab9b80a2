//! Interactive chat with a webhook-backed voice agent.
//!
//! Typed lines are sent as text turns.  `/voice` starts recording from the
//! microphone; the next Enter stops the recording and sends it as a voice
//! turn, while Ctrl+C discards it.  Audio replies are played as they arrive.
//!
//! # Usage
//!
//! ```bash
//! # Point at a webhook
//! voicehook-chat --webhook-url https://example.com/webhook/chat
//!
//! # Or take it from the environment
//! VOICEHOOK_WEBHOOK_URL=https://example.com/webhook/chat voicehook-chat
//!
//! # Record with ALSA instead of PulseAudio, never play audio
//! voicehook-chat --record-command "ffmpeg -loglevel error -f alsa -i default -f webm pipe:1" --no-audio
//! ```
//!
//! Diagnostics go to stderr; set `RUST_LOG=voicehook=debug` for more.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use voicehook::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    ignored_while_recording, parse_command,
};

/// Main entry point for the voicehook-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("voicehook-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let mut session = ChatSession::from_config(&config)?;
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    println!("Voice chat (webhook: {})", config.webhook_url);
    println!("Type /help for commands, /voice to talk, /quit to exit\n");

    loop {
        let prompt = if session.is_recording() {
            "(recording, Enter to send) "
        } else {
            "> "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                if session.is_recording() {
                    if let Some(notice) = ignored_while_recording(&line) {
                        renderer.print_info(&notice);
                    }
                    match session.stop_recording(&mut renderer).await {
                        Ok(Some(_)) => {}
                        Ok(None) => renderer.print_info("Not recording."),
                        Err(err) => renderer.print_error(&format!("Recording failed: {err}")),
                    }
                    continue;
                }

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                if let Some(cmd) = parse_command(trimmed) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Voice => match session.start_recording().await {
                            Ok(true) => renderer
                                .print_info("Recording... press Enter to send, Ctrl+C to cancel."),
                            Ok(false) => renderer.print_info("Already recording."),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Session => {
                            renderer.print_info(&format!("Session: {}", session.session_id()));
                        }
                        ChatCommand::History => {
                            if session.conversation().is_empty() {
                                renderer.print_info("(no messages yet)");
                            } else {
                                renderer.print_history(session.conversation());
                            }
                        }
                        ChatCommand::SaveTranscript(path) => {
                            match session.save_transcript_to(&path) {
                                Ok(_) => {
                                    renderer.print_info(&format!("Transcript saved to {}", path))
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Failed to save transcript: {}", err)),
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message; failures are reported in the conversation.
                session.send_text(&line, &mut renderer).await;
            }
            Err(ReadlineError::Interrupted) => {
                if session.cancel_recording() {
                    renderer.print_info("Recording cancelled.");
                } else {
                    println!();
                }
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Session: {}", stats.session_id);
    println!(
        "      Messages: {} ({} you / {} bot)",
        stats.message_count, stats.user_messages, stats.bot_messages
    );
    println!(
        "      Turns: {} text / {} voice",
        stats.text_turns, stats.voice_turns
    );
    println!("      Failed turns: {}", stats.failed_turns);
    println!("      Empty replies: {}", stats.empty_replies);
    println!("      Audio replies: {}", stats.audio_replies);
    println!(
        "      Recording: {}",
        if stats.recording { "yes" } else { "no" }
    );
}
