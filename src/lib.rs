// Public modules
pub mod audio;
pub mod chat;
pub mod client;
pub mod error;
pub mod observability;
pub mod types;

// Re-exports
pub use audio::{AudioPlayer, CaptureState, Microphone, Recording, VoiceCapture};
pub use client::{Transport, Webhook};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use types::*;
