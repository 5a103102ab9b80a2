// Public modules
pub mod audio_clip;
pub mod conversation;
pub mod message;
pub mod session_id;
pub mod text_turn;
pub mod webhook_reply;

// Re-exports
pub use audio_clip::AudioClip;
pub use conversation::Conversation;
pub use message::{Message, MessageRole};
pub use session_id::SessionId;
pub use text_turn::TextTurn;
pub use webhook_reply::WebhookReply;
