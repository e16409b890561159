//! Pusher wire protocol.
//!
//! This module decodes inbound text frames and classifies them into
//! protocol-control events and application events.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `pusher:connection_established` | Server → Client | Session ready, carries socket ID |
//! | `pusher:error` | Server → Client | Protocol error with code and message |
//! | `pusher:ping` / `pusher:pong` | Both | Keep-alive |
//! | anything else | Server → Client | Application event, routed by name |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | `{event, channel, data}` frame shape |
//! | `event` | Control event classification and payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Frame envelope.
pub mod envelope;

/// Control event classification.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::ProtocolEnvelope;
pub use event::{ConnectionEstablished, ProtocolEvent, ServerError};
