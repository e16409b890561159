//! Type-safe identifier wrappers.
//!
//! Newtypes keep server-assigned identifiers from being mixed up with
//! arbitrary strings such as channel or event names.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// SocketId
// ============================================================================

/// Server-assigned session identifier.
///
/// Delivered in the `pusher:connection_established` frame. The connection
/// layer stores it but never interprets it; upstream collaborators use it
/// when signing private channel subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(String);

impl SocketId {
    /// Creates a socket ID from its wire representation.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SocketId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_id_display() {
        let id = SocketId::new("21112.816204");
        assert_eq!(id.to_string(), "21112.816204");
        assert_eq!(id.as_str(), "21112.816204");
    }

    #[test]
    fn test_socket_id_deserialize_transparent() {
        let id: SocketId = serde_json::from_str(r#""123.456""#).expect("parse");
        assert_eq!(id, SocketId::from("123.456"));
    }
}
