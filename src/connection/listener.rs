//! Listener interface for connection notifications.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Error;

use super::ConnectionStateChange;

// ============================================================================
// ConnectionEventListener
// ============================================================================

/// Sink for state-change and error notifications.
///
/// A connection holds at most one listener. Both methods may be invoked
/// zero or more times; for a single triggering event, a state change is
/// always delivered before the error that caused it.
///
/// Notifications run on the connection's executor. With the instant
/// executor they run on the thread that triggered them, so implementations
/// may call back into the connection but must not block on it from another
/// thread.
pub trait ConnectionEventListener: Send + Sync {
    /// Called once per accepted state transition.
    fn on_connection_state_change(&self, change: ConnectionStateChange);

    /// Called for every non-fatal failure observed by the connection.
    ///
    /// `code` is the server-supplied error code, if any. `cause` is the
    /// underlying failure for transport and decode errors.
    fn on_error(&self, message: &str, code: Option<&str>, cause: Option<&Error>);
}
