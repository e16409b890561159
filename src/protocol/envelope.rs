//! Wire envelope shared by every Pusher frame.
//!
//! # Format
//!
//! ```json
//! {
//!   "event": "my-event",
//!   "channel": "my-channel",
//!   "data": { ... }
//! }
//! ```
//!
//! `channel` is absent on protocol-control frames. `data` may be an object
//! or a string holding encoded JSON; the envelope keeps it uninterpreted.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Map, Value, from_str, to_string};

use crate::error::{Error, Result};

// ============================================================================
// ProtocolEnvelope
// ============================================================================

/// Decoded `{event, channel, data}` shape of one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolEnvelope {
    /// Event name (`pusher:*` for protocol-control events).
    pub event: String,

    /// Channel the event belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Raw event payload.
    pub data: Value,
}

impl ProtocolEnvelope {
    /// Creates an envelope with no channel.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            channel: None,
            data,
        }
    }

    /// Decodes an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the frame is not a JSON object, has no
    /// string `event` field, or carries a non-string `channel`.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value = from_str(raw)
            .map_err(|e| Error::decode(format!("frame is not valid JSON: {e}")))?;

        let Value::Object(mut fields) = value else {
            return Err(Error::decode("frame is not a JSON object"));
        };

        let event = match fields.remove("event") {
            Some(Value::String(event)) => event,
            Some(_) => return Err(Error::decode("`event` field is not a string")),
            None => return Err(Error::decode("frame has no `event` field")),
        };

        let channel = Self::take_channel(&mut fields)?;
        let data = fields.remove("data").unwrap_or(Value::Null);

        Ok(Self {
            event,
            channel,
            data,
        })
    }

    /// Encodes the envelope as an outbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(to_string(self)?)
    }

    /// Returns `true` for events reserved by the Pusher protocol.
    #[inline]
    #[must_use]
    pub fn is_protocol_event(&self) -> bool {
        self.event.starts_with("pusher:")
    }

    fn take_channel(fields: &mut Map<String, Value>) -> Result<Option<String>> {
        match fields.remove("channel") {
            Some(Value::String(channel)) => Ok(Some(channel)),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(Error::decode("`channel` field is not a string")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
