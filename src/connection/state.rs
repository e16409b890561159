//! Connection lifecycle states.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport is open. Initial state, re-entered after every close.
    #[default]
    Disconnected,
    /// Transport opened, waiting for `pusher:connection_established`.
    Connecting,
    /// Session established; messages may be sent.
    Connected,
    /// Clean close requested, waiting for the transport to report it.
    Disconnecting,
}

impl ConnectionState {
    /// Returns `true` while a transport handle is live.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Returns `true` only in [`ConnectionState::Connected`].
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("DISCONNECTED"),
            Self::Connecting => f.write_str("CONNECTING"),
            Self::Connected => f.write_str("CONNECTED"),
            Self::Disconnecting => f.write_str("DISCONNECTING"),
        }
    }
}

// ============================================================================
// ConnectionStateChange
// ============================================================================

/// An accepted state transition.
///
/// Produced exactly once per transition and never for no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionStateChange {
    previous: ConnectionState,
    current: ConnectionState,
}

impl ConnectionStateChange {
    /// Creates a state change record.
    #[inline]
    #[must_use]
    pub const fn new(previous: ConnectionState, current: ConnectionState) -> Self {
        Self { previous, current }
    }

    /// State before the transition.
    #[inline]
    #[must_use]
    pub const fn previous(&self) -> ConnectionState {
        self.previous
    }

    /// State after the transition.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> ConnectionState {
        self.current
    }
}

impl fmt::Display for ConnectionStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.previous, self.current)
    }
}

// ============================================================================
// Tests
// ============================================================================
