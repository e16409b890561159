//! Connection state machine.
//!
//! [`Connection`] owns the lifecycle of one Pusher session. It opens a
//! transport handle, classifies every inbound frame, applies state
//! transitions, and notifies its listener.
//!
//! # Locking
//!
//! Every entry point first takes a re-entrant dispatch lock, which
//! serializes operations and keeps notifications in transition order.
//! State, listener, handle, socket ID and generation live together behind
//! one inner mutex. The inner mutex is never held while calling the
//! transport, the router, the executor, or the listener, so any of them may
//! call back into the connection from the same thread.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::executor::EventQueue;
use crate::identifiers::SocketId;
use crate::protocol::event::pong;
use crate::protocol::{ConnectionEstablished, ProtocolEvent};
use crate::router::MessageRouter;
use crate::transport::{Transport, TransportHandle, TransportSink};

use super::builder::ConnectionBuilder;
use super::listener::ConnectionEventListener;
use super::state::{ConnectionState, ConnectionStateChange};

// ============================================================================
// Constants
// ============================================================================

/// Error message for a terminal transport failure.
const TRANSPORT_ERROR_MESSAGE: &str = "An exception was thrown by the websocket";

// ============================================================================
// Notification
// ============================================================================

/// A pending listener callback.
enum Notification {
    StateChange(ConnectionStateChange),
    Error {
        message: String,
        code: Option<String>,
        cause: Option<Arc<Error>>,
    },
}

impl Notification {
    fn error(message: impl Into<String>, code: Option<String>, cause: Option<Error>) -> Self {
        Self::Error {
            message: message.into(),
            code,
            cause: cause.map(Arc::new),
        }
    }
}

/// Notifications bound to the listener that was registered when they were
/// produced.
struct Outbox {
    listener: Option<Arc<dyn ConnectionEventListener>>,
    notifications: Vec<Notification>,
}

impl Outbox {
    fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

// ============================================================================
// ConnectionCore
// ============================================================================

/// State guarded as a unit.
struct ConnectionCore {
    state: ConnectionState,
    listener: Option<Arc<dyn ConnectionEventListener>>,
    handle: Option<Arc<dyn TransportHandle>>,
    socket_id: Option<SocketId>,
    /// Incremented on every `connect`.
    generation: u64,
    /// Generation whose callbacks are still accepted.
    active: Option<u64>,
    /// Establishment received before `open` returned the handle.
    pending: Option<ConnectionEstablished>,
}

impl ConnectionCore {
    fn new(listener: Option<Arc<dyn ConnectionEventListener>>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            listener,
            handle: None,
            socket_id: None,
            generation: 0,
            active: None,
            pending: None,
        }
    }

    /// Applies a transition and returns the change, or `None` for a no-op.
    fn transition(&mut self, next: ConnectionState) -> Option<ConnectionStateChange> {
        if self.state == next {
            return None;
        }

        let change = ConnectionStateChange::new(self.state, next);
        self.state = next;

        if next == ConnectionState::Disconnected {
            self.handle = None;
            self.socket_id = None;
            self.active = None;
            self.pending = None;
        }

        debug!(%change, "Connection state changed");
        Some(change)
    }

    /// Returns `true` if callbacks from `origin` must be dropped.
    ///
    /// `None` marks a direct call, which always applies to the current state.
    fn is_stale(&self, origin: Option<u64>) -> bool {
        match origin {
            Some(generation) => self.active != Some(generation),
            None => false,
        }
    }

    fn outbox(&self) -> Outbox {
        Outbox {
            listener: self.listener.clone(),
            notifications: Vec::new(),
        }
    }

    /// Moves `Connecting` to `Connected`. Requires an attached handle.
    fn establish(&mut self, established: ConnectionEstablished) -> Outbox {
        info!(
            socket_id = %established.socket_id,
            activity_timeout = ?established.activity_timeout,
            "Connection established"
        );
        self.socket_id = Some(established.socket_id);

        let mut outbox = self.outbox();
        if let Some(change) = self.transition(ConnectionState::Connected) {
            outbox.notifications.push(Notification::StateChange(change));
        }
        outbox
    }
}

// ============================================================================
// ConnectionInner
// ============================================================================

/// Shared connection internals.
pub(crate) struct ConnectionInner {
    /// Endpoint every handle is opened against.
    url: Url,
    transport: Arc<dyn Transport>,
    router: Arc<dyn MessageRouter>,
    executor: Arc<dyn EventQueue>,
    /// Serializes entry points and notification hand-off.
    dispatch: ReentrantMutex<()>,
    core: Mutex<ConnectionCore>,
}

impl ConnectionInner {
    /// Hands notifications to the executor. Caller holds the dispatch lock.
    fn deliver(&self, outbox: Outbox) {
        let Some(listener) = outbox.listener else {
            if !outbox.notifications.is_empty() {
                trace!(
                    count = outbox.notifications.len(),
                    "No listener, dropping notifications"
                );
            }
            return;
        };

        for notification in outbox.notifications {
            let listener = Arc::clone(&listener);
            match notification {
                Notification::StateChange(change) => {
                    self.executor
                        .execute(Box::new(move || listener.on_connection_state_change(change)));
                }
                Notification::Error {
                    message,
                    code,
                    cause,
                } => {
                    self.executor.execute(Box::new(move || {
                        listener.on_error(&message, code.as_deref(), cause.as_deref());
                    }));
                }
            }
        }
    }

    /// Reports a single error notification.
    fn report_error(&self, message: impl Into<String>, code: Option<String>, cause: Option<Error>) {
        let mut outbox = self.core.lock().outbox();
        outbox
            .notifications
            .push(Notification::error(message, code, cause));
        self.deliver(outbox);
    }

    // ========================================================================
    // Caller operations
    // ========================================================================

    fn connect(self: &Arc<Self>) {
        let _dispatch = self.dispatch.lock();

        let (generation, outbox) = {
            let mut core = self.core.lock();
            if core.state.is_active() {
                debug!(state = %core.state, "Connect ignored");
                return;
            }

            core.generation += 1;
            core.active = Some(core.generation);

            let mut outbox = core.outbox();
            if let Some(change) = core.transition(ConnectionState::Connecting) {
                outbox.notifications.push(Notification::StateChange(change));
            }
            (core.generation, outbox)
        };
        self.deliver(outbox);

        let sink = Arc::new(ConnectionSink {
            inner: Arc::downgrade(self),
            generation,
        });

        match self.transport.open(&self.url, sink) {
            Ok(handle) => self.attach(generation, handle),
            Err(e) => {
                warn!(error = %e, "Failed to open transport");
                self.handle_error(Some(generation), e);
            }
        }
    }

    /// Stores a freshly opened handle unless its generation is already over,
    /// then applies an establishment that arrived while `open` was running.
    /// Caller holds the dispatch lock.
    fn attach(&self, generation: u64, handle: Arc<dyn TransportHandle>) {
        let (close_now, outbox) = {
            let mut core = self.core.lock();
            if core.is_stale(Some(generation)) {
                (true, None)
            } else {
                core.handle = Some(Arc::clone(&handle));
                match core.pending.take() {
                    Some(established) if core.state == ConnectionState::Connecting => {
                        (false, Some(core.establish(established)))
                    }
                    _ => (core.state == ConnectionState::Disconnecting, None),
                }
            }
        };

        if close_now {
            debug!(generation, "Closing handle opened for a finished connection");
            handle.close();
        }
        if let Some(outbox) = outbox {
            self.deliver(outbox);
        }
    }

    fn disconnect(&self) {
        let _dispatch = self.dispatch.lock();

        let (handle, outbox) = {
            let mut core = self.core.lock();
            if !matches!(
                core.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                debug!(state = %core.state, "Disconnect ignored");
                return;
            }

            let mut outbox = core.outbox();
            if let Some(change) = core.transition(ConnectionState::Disconnecting) {
                outbox.notifications.push(Notification::StateChange(change));
            }
            (core.handle.clone(), outbox)
        };
        self.deliver(outbox);

        if let Some(handle) = handle {
            handle.close();
        }
    }

    fn send_message(&self, payload: &str) {
        let _dispatch = self.dispatch.lock();

        let handle = {
            let core = self.core.lock();
            match (&core.handle, core.state) {
                (Some(handle), state) if state.can_send() => Ok(Arc::clone(handle)),
                (_, state) => Err(state),
            }
        };

        match handle {
            Ok(handle) => {
                trace!(len = payload.len(), "Sending message");
                if let Err(e) = handle.send(payload) {
                    warn!(error = %e, "Transport failed to send message");
                    self.report_error(
                        format!("An exception occurred while sending message [{payload}]"),
                        None,
                        Some(e),
                    );
                }
            }
            Err(state) => {
                debug!(%state, "Send rejected");
                self.report_error(
                    Error::invalid_state("send a message", state).to_string(),
                    None,
                    None,
                );
            }
        }
    }

    fn set_event_listener(&self, listener: Option<Arc<dyn ConnectionEventListener>>) {
        let _dispatch = self.dispatch.lock();
        self.core.lock().listener = listener;
    }

    // ========================================================================
    // Transport callbacks
    // ========================================================================

    fn handle_message(&self, origin: Option<u64>, raw: &str) {
        let _dispatch = self.dispatch.lock();

        if self.core.lock().is_stale(origin) {
            debug!(?origin, "Dropping frame from stale transport");
            return;
        }

        let event = match ProtocolEvent::parse(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to decode frame");
                self.report_error(e.to_string(), None, Some(e));
                return;
            }
        };

        match event {
            ProtocolEvent::ConnectionEstablished(established) => {
                self.handle_established(established);
            }

            ProtocolEvent::Error(error) => {
                warn!(code = ?error.code, reason = %error.message, "Server reported error");
                self.report_error(error.message, error.code, None);
            }

            ProtocolEvent::Ping => self.handle_ping(),

            ProtocolEvent::Application { event, channel } => {
                trace!(%event, ?channel, "Routing message");
                self.router.on_message(&event, raw);
            }
        }
    }

    fn handle_established(&self, established: ConnectionEstablished) {
        let outbox = {
            let mut core = self.core.lock();
            match core.state {
                ConnectionState::Connecting if core.handle.is_none() => {
                    debug!("Deferring connection_established until the handle is attached");
                    core.pending = Some(established);
                    return;
                }
                ConnectionState::Connecting => core.establish(established),
                state => {
                    debug!(%state, "Ignoring connection_established");
                    return;
                }
            }
        };

        if !outbox.is_empty() {
            self.deliver(outbox);
        }
    }

    fn handle_ping(&self) {
        if self.core.lock().state != ConnectionState::Connected {
            debug!("Ignoring ping while not connected");
            return;
        }

        match pong().encode() {
            Ok(frame) => self.send_message(&frame),
            Err(e) => warn!(error = %e, "Failed to encode pong"),
        }
    }

    fn handle_close(&self, origin: Option<u64>, code: u16, reason: &str, remote: bool) {
        let _dispatch = self.dispatch.lock();

        let outbox = {
            let mut core = self.core.lock();
            if core.is_stale(origin) {
                debug!(?origin, code, "Dropping close from stale transport");
                return;
            }

            debug!(code, reason, remote, "Transport closed");
            let mut outbox = core.outbox();
            if let Some(change) = core.transition(ConnectionState::Disconnected) {
                outbox.notifications.push(Notification::StateChange(change));
            }
            outbox
        };

        self.deliver(outbox);
    }

    fn handle_error(&self, origin: Option<u64>, cause: Error) {
        let _dispatch = self.dispatch.lock();

        let outbox = {
            let mut core = self.core.lock();
            if core.is_stale(origin) {
                debug!(?origin, error = %cause, "Dropping error from stale transport");
                return;
            }

            warn!(error = %cause, "Transport error");
            let mut outbox = core.outbox();
            if let Some(change) = core.transition(ConnectionState::Disconnected) {
                outbox.notifications.push(Notification::StateChange(change));
            }
            outbox.notifications.push(Notification::error(
                TRANSPORT_ERROR_MESSAGE,
                None,
                Some(cause),
            ));
            outbox
        };

        self.deliver(outbox);
    }
}

// ============================================================================
// ConnectionSink
// ============================================================================

/// Callback target handed to the transport for one generation.
struct ConnectionSink {
    inner: Weak<ConnectionInner>,
    generation: u64,
}

impl TransportSink for ConnectionSink {
    fn on_message(&self, message: &str) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_message(Some(self.generation), message);
        }
    }

    fn on_close(&self, code: u16, reason: &str, remote: bool) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_close(Some(self.generation), code, reason, remote);
        }
    }

    fn on_error(&self, cause: Error) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_error(Some(self.generation), cause);
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A Pusher connection.
///
/// Cloning is cheap; clones share the same state machine.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`. Every operation is non-blocking and
/// reports failures to the listener instead of returning them.
///
/// # Example
///
/// ```ignore
/// let connection = Connection::builder("app-key")
///     .router(Arc::new(|event: &str, raw: &str| println!("{event}: {raw}")))
///     .listener(listener)
///     .build()?;
///
/// connection.connect();
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.inner.url.as_str())
            .field("state", &self.state())
            .field("socket_id", &self.socket_id())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a configuration builder for a connection.
    #[inline]
    #[must_use]
    pub fn builder(key: impl Into<String>) -> ConnectionBuilder {
        ConnectionBuilder::new(key)
    }

    /// Creates a connection from explicit collaborators.
    #[must_use]
    pub fn new(
        url: Url,
        transport: Arc<dyn Transport>,
        router: Arc<dyn MessageRouter>,
        executor: Arc<dyn EventQueue>,
        listener: Option<Arc<dyn ConnectionEventListener>>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                url,
                transport,
                router,
                executor,
                dispatch: ReentrantMutex::new(()),
                core: Mutex::new(ConnectionCore::new(listener)),
            }),
        }
    }

    /// Opens the transport and moves to [`ConnectionState::Connecting`].
    ///
    /// Does nothing unless the connection is
    /// [`ConnectionState::Disconnected`].
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Requests a clean close.
    ///
    /// Moves to [`ConnectionState::Disconnecting`]; the transport's close
    /// callback completes the move to [`ConnectionState::Disconnected`].
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Sends a text frame verbatim.
    ///
    /// Only forwarded while [`ConnectionState::Connected`]; otherwise, or if
    /// the transport rejects the frame, the listener receives an error.
    pub fn send_message(&self, payload: &str) {
        self.inner.send_message(payload);
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.core.lock().state
    }

    /// Returns the socket ID assigned by the server, while connected.
    #[inline]
    #[must_use]
    pub fn socket_id(&self) -> Option<SocketId> {
        self.inner.core.lock().socket_id.clone()
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Replaces the listener. Earlier notifications are not replayed.
    pub fn set_event_listener(&self, listener: Arc<dyn ConnectionEventListener>) {
        self.inner.set_event_listener(Some(listener));
    }

    /// Removes the listener. Later notifications are dropped.
    pub fn clear_event_listener(&self) {
        self.inner.set_event_listener(None);
    }

    /// Processes an inbound frame from the current transport handle.
    pub fn on_message(&self, message: &str) {
        self.inner.handle_message(None, message);
    }

    /// Processes a close of the current transport handle.
    pub fn on_close(&self, code: u16, reason: &str, remote: bool) {
        self.inner.handle_close(None, code, reason, remote);
    }

    /// Processes a failure of the current transport handle.
    pub fn on_error(&self, cause: Error) {
        self.inner.handle_error(None, cause);
    }
}

// ============================================================================
// Tests
// ============================================================================
