//! Builder pattern for connection configuration.
//!
//! Provides a fluent API for wiring a [`Connection`] to its collaborators.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pusher_client::{Connection, PusherOptions};
//!
//! # async fn example() -> pusher_client::Result<()> {
//! let connection = Connection::builder("app-key")
//!     .options(PusherOptions::new().with_cluster("eu"))
//!     .router(Arc::new(|event: &str, raw: &str| println!("{event}: {raw}")))
//!     .build()?;
//!
//! connection.connect();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::executor::{EventQueue, QueuedExecutor};
use crate::options::PusherOptions;
use crate::router::MessageRouter;
use crate::transport::{Transport, WebSocketTransport};

use super::core::Connection;
use super::listener::ConnectionEventListener;

// ============================================================================
// ConnectionBuilder
// ============================================================================

/// Builder for configuring a [`Connection`].
///
/// Use [`Connection::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ConnectionBuilder {
    /// Pusher application key.
    key: String,
    /// Endpoint options.
    options: PusherOptions,
    /// Transport, defaults to [`WebSocketTransport`].
    transport: Option<Arc<dyn Transport>>,
    /// Router for application events. Required.
    router: Option<Arc<dyn MessageRouter>>,
    /// Notification executor, defaults to [`QueuedExecutor`].
    executor: Option<Arc<dyn EventQueue>>,
    /// Initial listener.
    listener: Option<Arc<dyn ConnectionEventListener>>,
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("has_transport", &self.transport.is_some())
            .field("has_router", &self.router.is_some())
            .field("has_executor", &self.executor.is_some())
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

// ============================================================================
// ConnectionBuilder Implementation
// ============================================================================

impl ConnectionBuilder {
    /// Creates a builder for an application key.
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Sets endpoint options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: PusherOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the transport used to open handles.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the router that receives application events.
    #[inline]
    #[must_use]
    pub fn router(mut self, router: Arc<dyn MessageRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the executor that runs listener notifications.
    #[inline]
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn EventQueue>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Registers the initial listener.
    #[inline]
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn ConnectionEventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Builds the connection.
    ///
    /// The connection starts [`Disconnected`](super::ConnectionState::Disconnected);
    /// call [`Connection::connect`] to open it.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the key is empty or no router was set
    /// - [`Error::Config`] if no executor was set and there is no tokio runtime
    /// - [`Error::Url`] if the endpoint cannot be built
    pub fn build(self) -> Result<Connection> {
        let url = self.options.endpoint(&self.key)?;

        let router = self
            .router
            .ok_or_else(|| Error::config("a message router is required"))?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(QueuedExecutor::new()?),
        };

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new()));

        Ok(Connection::new(
            url,
            transport,
            router,
            executor,
            self.listener,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::connection::ConnectionState;
    use crate::executor::InstantExecutor;

    fn noop_router() -> Arc<dyn MessageRouter> {
        Arc::new(|_: &str, _: &str| {})
    }

    #[test]
    fn test_build_requires_router() {
        let err = ConnectionBuilder::new("key")
            .executor(Arc::new(InstantExecutor))
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("router is required"));
    }

    #[test]
    fn test_build_rejects_empty_key() {
        let err = ConnectionBuilder::new("")
            .router(noop_router())
            .executor(Arc::new(InstantExecutor))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_without_runtime_needs_executor() {
        let err = ConnectionBuilder::new("key")
            .router(noop_router())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("tokio runtime"));
    }

    #[test]
    fn test_build_with_instant_executor() {
        let connection = Connection::builder("key")
            .options(PusherOptions::new().with_host("localhost").with_ws_port(6001))
            .router(noop_router())
            .executor(Arc::new(InstantExecutor))
            .build()
            .expect("build");

        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert_eq!(connection.url().port(), Some(6001));
        assert_eq!(connection.url().path(), "/app/key");
    }

    #[tokio::test]
    async fn test_build_defaults_inside_runtime() {
        let connection = Connection::builder("key")
            .router(noop_router())
            .build()
            .expect("build");

        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }
}
