//! Incoming push frames.

use serde_json::Value;

use super::errors::FrameError;

/// Current discriminator field.
pub const TYPE_FIELD: &str = "type";

/// Discriminator used by the older message shape; read when `type` is absent.
pub const LEGACY_EVENT_FIELD: &str = "event";

/// One parsed push message.
///
/// The dispatcher attaches no meaning to the payload beyond its event type;
/// subscribers usually treat a frame as a cue to re-fetch from the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    event_type: String,
    /// The full parsed message, discriminator included
    pub payload: Value,
}

impl Frame {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Fails when the text is not JSON or carries no usable discriminator.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let payload: Value = serde_json::from_str(text)?;
        let event_type = discriminator(&payload)
            .ok_or(FrameError::MissingDiscriminator)?
            .to_string();
        Ok(Self {
            event_type,
            payload,
        })
    }

    /// Parse a binary frame holding UTF-8 JSON.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(bytes).map_err(|_| FrameError::NotText)?;
        Self::parse(text)
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }
}

/// Read a message's event type: `type` first, then the legacy `event` field.
/// Only non-empty strings count.
pub fn discriminator(payload: &Value) -> Option<&str> {
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    field(TYPE_FIELD).or_else(|| field(LEGACY_EVENT_FIELD))
}
