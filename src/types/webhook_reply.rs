use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::AudioClip;
use crate::types::audio_clip::REPLY_MIME_TYPE;

/// Standard alphabet; padding may be present or omitted.
const AUDIO_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The decoded reply of the webhook to either kind of turn.
///
/// Both fields are optional and independent.  A field only counts as present
/// when it is a non-empty string; anything else (missing, `null`, a number,
/// an empty string) is treated as absent.  A body that is valid JSON but not an
/// object is a valid-but-empty reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReply {
    /// Text to show as a bot message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Base64-encoded `audio/mpeg` to play back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
}

impl WebhookReply {
    /// Create a reply with only text.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            audio_data: None,
        }
    }

    /// Create a reply with only base64 audio.
    pub fn audio(audio_data: impl Into<String>) -> Self {
        Self {
            output: None,
            audio_data: Some(audio_data.into()),
        }
    }

    /// Parse a response body.
    ///
    /// Fails only when the body is not JSON at all.
    pub fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(&value))
    }

    /// Extract the recognized fields from an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let non_empty = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            output: non_empty("output"),
            audio_data: non_empty("audioData"),
        }
    }

    /// The text output, if present and non-empty.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref().filter(|s| !s.is_empty())
    }

    /// True if the reply carries audio.
    pub fn has_audio(&self) -> bool {
        self.audio_data.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// True if the reply carries neither text nor audio.
    pub fn is_empty(&self) -> bool {
        self.output().is_none() && !self.has_audio()
    }

    /// Decode the audio payload, if any.
    ///
    /// ASCII whitespace anywhere in the payload is ignored, as is missing padding.
    pub fn decode_audio(&self) -> Option<Result<AudioClip>> {
        let encoded = self.audio_data.as_deref().filter(|s| !s.is_empty())?;
        let compact: Vec<u8> = encoded
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        Some(
            AUDIO_ENGINE
                .decode(compact)
                .map(|data| AudioClip::new(data, REPLY_MIME_TYPE))
                .map_err(Into::into),
        )
    }
}
