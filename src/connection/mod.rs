//! Connection lifecycle.
//!
//! # State Machine
//!
//! ```text
//!                connect()
//!  DISCONNECTED ───────────► CONNECTING
//!       ▲                        │ pusher:connection_established
//!       │ close / error          ▼
//!       ├──────────────────── CONNECTED
//!       │                        │ disconnect()
//!       │ close / error          ▼
//!       └─────────────────── DISCONNECTING
//! ```
//!
//! Close and error callbacks move any active state to `DISCONNECTED`.
//! Every accepted transition produces exactly one
//! [`ConnectionStateChange`]; repeated `connect()` calls and duplicate
//! `connection_established` frames produce none.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ConnectionBuilder`] |
//! | `core` | [`Connection`] state machine |
//! | `listener` | [`ConnectionEventListener`] trait |
//! | `state` | [`ConnectionState`] and [`ConnectionStateChange`] |

// ============================================================================
// Submodules
// ============================================================================

/// Builder for connections.
pub mod builder;

/// Connection state machine.
pub mod core;

/// Listener trait.
pub mod listener;

/// Lifecycle states.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConnectionBuilder;
pub use self::core::Connection;
pub use listener::ConnectionEventListener;
pub use state::{ConnectionState, ConnectionStateChange};
