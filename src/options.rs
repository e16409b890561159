//! Connection endpoint configuration.
//!
//! Provides a type-safe interface for configuring where the connection
//! layer opens its WebSocket.
//!
//! # Example
//!
//! ```ignore
//! use pusher_client::PusherOptions;
//!
//! let options = PusherOptions::new()
//!     .with_cluster("eu")
//!     .with_encrypted(true);
//!
//! let url = options.endpoint("app-key")?;
//! // wss://ws-eu.pusher.com/app/app-key?client=pusher-rust&protocol=7&version=0.1.0
//! ```

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default Pusher WebSocket host.
pub const DEFAULT_HOST: &str = "ws.pusherapp.com";

/// Default port for plain `ws://` connections.
pub const DEFAULT_WS_PORT: u16 = 80;

/// Default port for `wss://` connections.
pub const DEFAULT_WSS_PORT: u16 = 443;

/// Pusher wire protocol version announced to the server.
pub const PROTOCOL_VERSION: u8 = 7;

/// Client name announced to the server.
const CLIENT_NAME: &str = "pusher-rust";

// ============================================================================
// PusherOptions
// ============================================================================

/// Endpoint options for a Pusher connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PusherOptions {
    /// WebSocket host name.
    pub host: String,

    /// Port used when `encrypted` is `false`.
    pub ws_port: u16,

    /// Port used when `encrypted` is `true`.
    pub wss_port: u16,

    /// Use `wss://` instead of `ws://`.
    pub encrypted: bool,
}

impl Default for PusherOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PusherOptions {
    /// Creates options pointing at the default Pusher host.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            ws_port: DEFAULT_WS_PORT,
            wss_port: DEFAULT_WSS_PORT,
            encrypted: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PusherOptions {
    /// Sets the WebSocket host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Targets a Pusher cluster (`ws-<cluster>.pusher.com`).
    #[inline]
    #[must_use]
    pub fn with_cluster(mut self, cluster: impl AsRef<str>) -> Self {
        self.host = format!("ws-{}.pusher.com", cluster.as_ref());
        self
    }

    /// Sets the port for unencrypted connections.
    #[inline]
    #[must_use]
    pub fn with_ws_port(mut self, port: u16) -> Self {
        self.ws_port = port;
        self
    }

    /// Sets the port for encrypted connections.
    #[inline]
    #[must_use]
    pub fn with_wss_port(mut self, port: u16) -> Self {
        self.wss_port = port;
        self
    }

    /// Enables or disables TLS.
    #[inline]
    #[must_use]
    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }
}

// ============================================================================
// Endpoint
// ============================================================================

impl PusherOptions {
    /// Returns the URL scheme for these options.
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.encrypted { "wss" } else { "ws" }
    }

    /// Returns the port for these options.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        if self.encrypted {
            self.wss_port
        } else {
            self.ws_port
        }
    }

    /// Builds the WebSocket endpoint for an application key.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `key` or the host is empty
    /// - [`Error::Url`] if the resulting URL is invalid
    pub fn endpoint(&self, key: &str) -> Result<Url> {
        if key.trim().is_empty() {
            return Err(Error::config("application key must not be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }

        let mut url = Url::parse(&format!(
            "{}://{}:{}/",
            self.scheme(),
            self.host,
            self.port()
        ))?;

        url.path_segments_mut()
            .map_err(|()| Error::config("host cannot carry a path"))?
            .clear()
            .push("app")
            .push(key);

        url.query_pairs_mut()
            .append_pair("client", CLIENT_NAME)
            .append_pair("protocol", &PROTOCOL_VERSION.to_string())
            .append_pair("version", env!("CARGO_PKG_VERSION"));

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
