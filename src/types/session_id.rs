use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix shared by every generated session identifier.
const SESSION_PREFIX: &str = "session-";

/// Number of random characters following the prefix.
const SESSION_RANDOM_LEN: usize = 11;

/// Alphabet for the random part of the identifier.
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque identifier correlating all turns of one conversation.
///
/// The webhook uses it to thread turns together; it is generated once per
/// session and sent unchanged with every request.  Uniqueness is best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier of the form `session-<11 base-36 chars>`.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SESSION_RANDOM_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("{SESSION_PREFIX}{suffix}"))
    }

    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
