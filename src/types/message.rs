use serde::{Deserialize, Serialize};

/// Who authored a chat entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Typed or spoken by the local user.
    User,

    /// Produced by the remote agent, or a placeholder standing in for it.
    Bot,
}

/// One immutable entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    text: String,
    role: MessageRole,
}

impl Message {
    /// Create a new message.
    pub fn new(text: impl Into<String>, role: MessageRole) -> Self {
        Self {
            text: text.into(),
            role,
        }
    }

    /// Create a user-role message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, MessageRole::User)
    }

    /// Create a bot-role message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, MessageRole::Bot)
    }

    /// The text of the message.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The role of the author.
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// True if the message came from the user.
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// True if the message came from the bot.
    pub fn is_bot(&self) -> bool {
        self.role == MessageRole::Bot
    }
}
