//! Classification of decoded envelopes.
//!
//! Protocol-control events are reserved by the Pusher service and handled
//! by the connection itself; everything else is an application event that
//! is routed onward untouched.
//!
//! # Control Events
//!
//! | Event | Payload |
//! |-------|---------|
//! | `pusher:connection_established` | `{"socket_id": string, "activity_timeout"?: number}` |
//! | `pusher:error` | `{"code": number \| null, "message": string}` |
//! | `pusher:ping` | answered with `pusher:pong` |

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, from_str, json};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::SocketId;

use super::ProtocolEnvelope;

// ============================================================================
// Constants
// ============================================================================

/// Sent by the server once the session is ready.
pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";

/// Sent by the server to report a protocol-level error.
pub const ERROR: &str = "pusher:error";

/// Server keep-alive probe.
pub const PING: &str = "pusher:ping";

/// Client keep-alive answer.
pub const PONG: &str = "pusher:pong";

/// Upper bound on string-encoded JSON layers unwrapped from a payload.
const MAX_NESTING: usize = 4;

// ============================================================================
// ProtocolEvent
// ============================================================================

/// Typed view of one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// Session established by the server.
    ConnectionEstablished(ConnectionEstablished),

    /// Error reported by the server.
    Error(ServerError),

    /// Keep-alive probe.
    Ping,

    /// Application-defined event.
    Application {
        /// Event name.
        event: String,
        /// Channel, if the frame carried one.
        channel: Option<String>,
    },
}

impl ProtocolEvent {
    /// Classifies a decoded envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if a control event's payload has an
    /// unexpected shape.
    pub fn classify(envelope: &ProtocolEnvelope) -> Result<Self> {
        match envelope.event.as_str() {
            CONNECTION_ESTABLISHED => decode_nested(&envelope.data, CONNECTION_ESTABLISHED)
                .map(Self::ConnectionEstablished),
            ERROR => decode_nested(&envelope.data, ERROR).map(Self::Error),
            PING => Ok(Self::Ping),
            _ => {
                if envelope.is_protocol_event() {
                    trace!(event = %envelope.event, "Routing unhandled protocol event");
                }
                Ok(Self::Application {
                    event: envelope.event.clone(),
                    channel: envelope.channel.clone(),
                })
            }
        }
    }

    /// Decodes and classifies a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for malformed frames.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::classify(&ProtocolEnvelope::decode(raw)?)
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Payload of `pusher:connection_established`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionEstablished {
    /// Server-assigned session identifier.
    pub socket_id: SocketId,

    /// Seconds of inactivity after which the server expects a ping.
    #[serde(default)]
    pub activity_timeout: Option<u64>,
}

/// Payload of `pusher:error`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawServerError")]
pub struct ServerError {
    /// Pusher error code, rendered as text. `None` when absent or null.
    pub code: Option<String>,

    /// Human-readable description.
    pub message: String,
}

#[derive(Deserialize)]
struct RawServerError {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    message: Option<String>,
}

impl From<RawServerError> for ServerError {
    fn from(raw: RawServerError) -> Self {
        let code = match raw.code {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s),
            _ => None,
        };

        Self {
            code,
            message: raw.message.unwrap_or_default(),
        }
    }
}

/// Builds the `pusher:pong` answer to a ping.
#[inline]
#[must_use]
pub fn pong() -> ProtocolEnvelope {
    ProtocolEnvelope::new(PONG, json!({}))
}

// ============================================================================
// Nested Decoding
// ============================================================================

/// Decodes a control payload that may be wrapped in string-encoded JSON.
///
/// Objects are decoded directly; strings are parsed and unwrapped again,
/// up to [`MAX_NESTING`] string layers.
fn decode_nested<T: DeserializeOwned>(data: &Value, event: &str) -> Result<T> {
    let mut current = Cow::Borrowed(data);

    // One pass per string layer, plus the final structured decode.
    for _ in 0..=MAX_NESTING {
        let next = match current.as_ref() {
            Value::String(text) => from_str::<Value>(text).map_err(|e| {
                Error::decode(format!("`{event}` payload is not valid JSON: {e}"))
            })?,
            other => {
                return T::deserialize(other).map_err(|e| {
                    Error::decode(format!("`{event}` payload has unexpected shape: {e}"))
                });
            }
        };
        current = Cow::Owned(next);
    }

    Err(Error::decode(format!("`{event}` payload is nested too deeply")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_established_string_encoded() {
        let raw = r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"21112.816204\"}"}"#;

        match ProtocolEvent::parse(raw).expect("parse") {
            ProtocolEvent::ConnectionEstablished(established) => {
                assert_eq!(established.socket_id.as_str(), "21112.816204");
                assert_eq!(established.activity_timeout, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_connection_established_object() {
        let raw = r#"{"event":"pusher:connection_established","data":{"socket_id":"1.2","activity_timeout":120}}"#;

        match ProtocolEvent::parse(raw).expect("parse") {
            ProtocolEvent::ConnectionEstablished(established) => {
                assert_eq!(established.socket_id.as_str(), "1.2");
                assert_eq!(established.activity_timeout, Some(120));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_connection_established_double_string_encoded() {
        let inner = r#"{"socket_id":"9.9"}"#;
        let once = serde_json::to_string(inner).expect("encode");
        let raw = serde_json::json!({ "event": CONNECTION_ESTABLISHED, "data": once }).to_string();

        match ProtocolEvent::parse(&raw).expect("parse") {
            ProtocolEvent::ConnectionEstablished(established) => {
                assert_eq!(established.socket_id.as_str(), "9.9");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    fn wrap_in_strings(layers: usize) -> String {
        let mut data = serde_json::json!({ "socket_id": "4.4" });
        for _ in 0..layers {
            data = Value::String(data.to_string());
        }
        serde_json::json!({ "event": CONNECTION_ESTABLISHED, "data": data }).to_string()
    }

    #[test]
    fn test_connection_established_nesting_limit() {
        for layers in 0..=MAX_NESTING {
            assert!(
                ProtocolEvent::parse(&wrap_in_strings(layers)).is_ok(),
                "{layers} layers should decode"
            );
        }

        let err = ProtocolEvent::parse(&wrap_in_strings(MAX_NESTING + 1)).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_connection_established_missing_socket_id() {
        let raw = r#"{"event":"pusher:connection_established","data":"{}"}"#;
        let err = ProtocolEvent::parse(raw).unwrap_err();
        assert!(err.is_decode_error());
        assert!(err.to_string().contains("unexpected shape"));
    }

    #[test]
    fn test_connection_established_garbage_string() {
        let raw = r#"{"event":"pusher:connection_established","data":"not json"}"#;
        let err = ProtocolEvent::parse(raw).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_error_with_code() {
        let raw = r#"{"event":"pusher:error","data":{"code":4001,"message":"Could not find app by key 12345"}}"#;

        assert_eq!(
            ProtocolEvent::parse(raw).expect("parse"),
            ProtocolEvent::Error(ServerError {
                code: Some("4001".into()),
                message: "Could not find app by key 12345".into(),
            })
        );
    }

    #[test]
    fn test_error_with_null_code() {
        let raw = r#"{"event":"pusher:error","data":{"code":null,"message":"oops"}}"#;

        match ProtocolEvent::parse(raw).expect("parse") {
            ProtocolEvent::Error(error) => {
                assert_eq!(error.code, None);
                assert_eq!(error.message, "oops");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_error_string_encoded_without_code() {
        let raw = r#"{"event":"pusher:error","data":"{\"message\":\"over quota\"}"}"#;

        match ProtocolEvent::parse(raw).expect("parse") {
            ProtocolEvent::Error(error) => {
                assert_eq!(error.code, None);
                assert_eq!(error.message, "over quota");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_ping() {
        let raw = r#"{"event":"pusher:ping","data":{}}"#;
        assert_eq!(ProtocolEvent::parse(raw).expect("parse"), ProtocolEvent::Ping);
    }

    #[test]
    fn test_application_event() {
        let raw = r#"{"event":"my-event","channel":"my-channel","data":{"fish":"chips"}}"#;

        assert_eq!(
            ProtocolEvent::parse(raw).expect("parse"),
            ProtocolEvent::Application {
                event: "my-event".into(),
                channel: Some("my-channel".into()),
            }
        );
    }

    #[test]
    fn test_unhandled_protocol_event_is_application() {
        let raw = r#"{"event":"pusher:signin_success","data":{"user_data":"{}"}}"#;

        assert_eq!(
            ProtocolEvent::parse(raw).expect("parse"),
            ProtocolEvent::Application {
                event: "pusher:signin_success".into(),
                channel: None,
            }
        );
    }

    #[test]
    fn test_pong_envelope() {
        let json = pong().encode().expect("encode");
        assert_eq!(json, r#"{"event":"pusher:pong","data":{}}"#);
    }
}
