//! Transport layer.
//!
//! The connection state machine consumes a raw socket through three small
//! traits and never touches the network itself.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   open(url, sink)   ┌──────────────────┐
//! │  Connection      │────────────────────►│  Transport       │
//! │  (state machine) │                     │                  │
//! │                  │◄────────────────────│  TransportHandle │
//! │  TransportSink   │ message/close/error │  (one per open)  │
//! └──────────────────┘                     └──────────────────┘
//! ```
//!
//! # Handle Lifecycle
//!
//! 1. `Transport::open` - Start connecting, return a handle immediately
//! 2. `TransportSink::on_message` - Zero or more inbound text frames
//! 3. `TransportSink::on_close` or `on_error` - At most one terminal callback
//! 4. `TransportHandle::close` - Request a clean close at any time
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | `tokio-tungstenite` implementation |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport backed by `tokio-tungstenite`.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::{WebSocketHandle, WebSocketTransport};

// ============================================================================
// Traits
// ============================================================================

/// Opens transport handles.
pub trait Transport: Send + Sync {
    /// Starts opening a connection to `url`.
    ///
    /// Callbacks for the new handle are delivered to `sink`, possibly from
    /// another thread and possibly before this method returns. A
    /// `pusher:connection_established` frame delivered before the handle is
    /// returned takes effect once the handle is attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot even be attempted. Failures
    /// during the handshake are reported through [`TransportSink::on_error`].
    fn open(&self, url: &Url, sink: Arc<dyn TransportSink>) -> Result<Arc<dyn TransportHandle>>;
}

/// One opened connection.
pub trait TransportHandle: Send + Sync {
    /// Queues a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be queued.
    fn send(&self, payload: &str) -> Result<()>;

    /// Requests a clean close. Completion is reported via
    /// [`TransportSink::on_close`].
    fn close(&self);
}

/// Receives callbacks for one handle.
pub trait TransportSink: Send + Sync {
    /// Inbound text frame.
    fn on_message(&self, message: &str);

    /// Terminal: the connection closed.
    fn on_close(&self, code: u16, reason: &str, remote: bool);

    /// Terminal: the connection failed.
    fn on_error(&self, cause: Error);
}
