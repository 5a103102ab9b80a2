use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// JSON body of a text turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTurn {
    /// Correlates the turn with the rest of the conversation.
    pub session_id: SessionId,

    /// What the user typed, untrimmed.
    pub chat_input: String,
}

impl TextTurn {
    /// Create a new text turn body.
    pub fn new(session_id: SessionId, chat_input: impl Into<String>) -> Self {
        Self {
            session_id,
            chat_input: chat_input.into(),
        }
    }
}
