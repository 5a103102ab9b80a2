use bytes::Bytes;

/// MIME type of recorded voice messages.
pub const VOICE_MIME_TYPE: &str = "audio/webm";

/// MIME type of audio returned by the webhook.
pub const REPLY_MIME_TYPE: &str = "audio/mpeg";

/// A finished blob of encoded audio and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    data: Bytes,
    mime_type: String,
}

impl AudioClip {
    /// Create a clip from raw bytes.
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Join recorded fragments into one voice clip.
    pub fn from_fragments<I>(fragments: I, mime_type: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        let mut data = Vec::new();
        for fragment in fragments {
            data.extend_from_slice(&fragment);
        }
        Self::new(data, mime_type)
    }

    /// The encoded audio.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The MIME type of the encoded audio.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no audio was captured.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
