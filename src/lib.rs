//! Pusher Client - connection layer for real-time pub/sub.
//!
//! This library owns the single persistent WebSocket of a Pusher client:
//! it tracks the connection lifecycle, turns inbound frames into typed
//! events, and exposes an outbound send primitive.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  on_message(event, raw)  ┌────────────────┐
//! │  Connection  │─────────────────────────►│ MessageRouter  │
//! │  (state      │                          │ (channels)     │
//! │   machine)   │  state change / error    ┌────────────────┐
//! │              │─────────────────────────►│ Listener       │
//! └──────┬───────┘   via EventQueue         └────────────────┘
//!        │ open / send / close
//!        ▼
//! ┌──────────────┐
//! │  Transport   │  message / close / error callbacks
//! └──────────────┘
//! ```
//!
//! Key design principles:
//!
//! - Collaborators (transport, router, executor) are injected
//! - Exactly one notification per accepted state transition
//! - Failures go to the listener, never back across a transport callback
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pusher_client::{
//!     Connection, ConnectionEventListener, ConnectionStateChange, Error, Result,
//! };
//!
//! struct Printer;
//!
//! impl ConnectionEventListener for Printer {
//!     fn on_connection_state_change(&self, change: ConnectionStateChange) {
//!         println!("state: {change}");
//!     }
//!
//!     fn on_error(&self, message: &str, code: Option<&str>, _cause: Option<&Error>) {
//!         println!("error {code:?}: {message}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = Connection::builder("app-key")
//!         .router(Arc::new(|event: &str, raw: &str| println!("{event}: {raw}")))
//!         .listener(Arc::new(Printer))
//!         .build()?;
//!
//!     connection.connect();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connection`] | [`Connection`] state machine, listener, builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`executor`] | Notification executors |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`options`] | Endpoint configuration |
//! | [`protocol`] | Pusher frame decoding |
//! | [`router`] | Application message boundary |
//! | [`transport`] | Socket abstraction and WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Connection state machine.
///
/// - [`Connection`] - Lifecycle owner
/// - [`ConnectionState`] - Lifecycle states
/// - [`ConnectionEventListener`] - Notification sink
pub mod connection;

/// Error types and result aliases.
pub mod error;

/// Execution contexts for listener notifications.
pub mod executor;

/// Type-safe identifiers.
pub mod identifiers;

/// Endpoint configuration.
pub mod options;

/// Pusher wire protocol.
pub mod protocol;

/// Application message routing.
pub mod router;

/// Transport abstraction.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connection types
pub use connection::{
    Connection, ConnectionBuilder, ConnectionEventListener, ConnectionState,
    ConnectionStateChange,
};

// Error types
pub use error::{Error, Result};

// Executor types
pub use executor::{EventQueue, InstantExecutor, QueuedExecutor};

// Identifier types
pub use identifiers::SocketId;

// Configuration types
pub use options::PusherOptions;

// Protocol types
pub use protocol::{ProtocolEnvelope, ProtocolEvent};

// Routing and transport types
pub use router::MessageRouter;
pub use transport::{Transport, TransportHandle, TransportSink, WebSocketTransport};
