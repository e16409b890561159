//! WebSocket transport and event loop.
//!
//! Each [`WebSocketTransport::open`] spawns a tokio task that owns the
//! socket. The task handles:
//!
//! - The client handshake
//! - Incoming text frames, forwarded to the sink
//! - Outgoing frames queued through the [`WebSocketHandle`]
//! - Exactly one terminal callback when the loop ends

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Transport, TransportHandle, TransportSink};

// ============================================================================
// Constants
// ============================================================================

/// Close code reported for a local clean close.
const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the peer sent a close frame without a status.
const CLOSE_NO_STATUS: u16 = 1005;

/// Close code reported when the stream ended without a close frame.
const CLOSE_ABNORMAL: u16 = 1006;

// ============================================================================
// TransportCommand
// ============================================================================

/// Internal commands for the event loop.
#[derive(Debug)]
enum TransportCommand {
    /// Send a text frame.
    Send(String),
    /// Close the connection.
    Close,
}

/// How the event loop ended.
enum Terminal {
    Closed {
        code: u16,
        reason: String,
        remote: bool,
    },
    Failed(Error),
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// [`Transport`] backed by `tokio-tungstenite`.
///
/// `wss://` endpoints need the `native-tls` crate feature.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    /// Runtime the event loops are spawned on. Falls back to the runtime
    /// current at `open` time.
    runtime: Option<Handle>,
}

impl WebSocketTransport {
    /// Creates a transport that spawns on the caller's runtime.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that spawns on a specific runtime.
    #[inline]
    #[must_use]
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    fn runtime(&self) -> Result<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current()
                .map_err(|e| Error::connection(format!("no tokio runtime available: {e}"))),
        }
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, url: &Url, sink: Arc<dyn TransportSink>) -> Result<Arc<dyn TransportHandle>> {
        let runtime = self.runtime()?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        debug!(%url, "Opening WebSocket");
        runtime.spawn(run_event_loop(url.to_string(), command_rx, sink));

        Ok(Arc::new(WebSocketHandle { command_tx }))
    }
}

// ============================================================================
// WebSocketHandle
// ============================================================================

/// Handle to one spawned WebSocket event loop.
///
/// Dropping every clone of the handle closes the socket.
#[derive(Debug, Clone)]
pub struct WebSocketHandle {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<TransportCommand>,
}

impl TransportHandle for WebSocketHandle {
    fn send(&self, payload: &str) -> Result<()> {
        self.command_tx
            .send(TransportCommand::Send(payload.to_string()))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let _ = self.command_tx.send(TransportCommand::Close);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop that owns one WebSocket.
async fn run_event_loop(
    url: String,
    mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
    sink: Arc<dyn TransportSink>,
) {
    // A finished handshake wins over a close requested in the same poll.
    let ws_stream = tokio::select! {
        biased;

        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                warn!(error = %e, "WebSocket handshake failed");
                sink.on_error(e.into());
                return;
            }
        },

        () = wait_for_close(&mut command_rx) => {
            debug!("Closed before handshake completed");
            sink.on_close(CLOSE_NORMAL, "closed before handshake", false);
            return;
        }
    };

    debug!("WebSocket handshake completed");
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let terminal = loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Frame received");
                        sink.on_message(text.as_str());
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                            .unwrap_or((CLOSE_NO_STATUS, String::new()));
                        break Terminal::Closed { code, reason, remote: true };
                    }

                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break Terminal::Failed(e.into());
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break Terminal::Closed {
                            code: CLOSE_ABNORMAL,
                            reason: "stream ended".to_string(),
                            remote: true,
                        };
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the connection
            command = command_rx.recv() => {
                match command {
                    Some(TransportCommand::Send(payload)) => {
                        if let Err(e) = ws_write.send(Message::Text(payload.into())).await {
                            warn!(error = %e, "Failed to send frame");
                            break Terminal::Failed(e.into());
                        }
                        trace!("Frame sent");
                    }

                    Some(TransportCommand::Close) | None => {
                        debug!("Close requested");
                        let _ = ws_write.close().await;
                        break Terminal::Closed {
                            code: CLOSE_NORMAL,
                            reason: String::new(),
                            remote: false,
                        };
                    }
                }
            }
        }
    };

    match terminal {
        Terminal::Closed {
            code,
            reason,
            remote,
        } => sink.on_close(code, &reason, remote),
        Terminal::Failed(cause) => sink.on_error(cause),
    }

    debug!("Event loop terminated");
}

/// Resolves once a close is requested or every handle is dropped.
async fn wait_for_close(command_rx: &mut mpsc::UnboundedReceiver<TransportCommand>) {
    loop {
        match command_rx.recv().await {
            Some(TransportCommand::Close) | None => return,
            Some(TransportCommand::Send(_)) => {
                warn!("Dropping frame queued before handshake completed");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use tokio::sync::oneshot;

    /// Sink that reports the first terminal callback.
    struct TerminalSink {
        done: Mutex<Option<oneshot::Sender<String>>>,
    }

    impl TransportSink for TerminalSink {
        fn on_message(&self, _message: &str) {}

        fn on_close(&self, code: u16, _reason: &str, remote: bool) {
            if let Some(tx) = self.done.lock().take() {
                let _ = tx.send(format!("close {code} remote={remote}"));
            }
        }

        fn on_error(&self, cause: Error) {
            if let Some(tx) = self.done.lock().take() {
                let _ = tx.send(format!("error {}", cause.is_connection_error()));
            }
        }
    }

    fn terminal_sink() -> (Arc<TerminalSink>, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        let sink = Arc::new(TerminalSink {
            done: Mutex::new(Some(tx)),
        });
        (sink, rx)
    }

    #[test]
    fn test_open_without_runtime_fails() {
        let (sink, _rx) = terminal_sink();
        let url = Url::parse("ws://127.0.0.1:1/app/key").expect("url");

        let result = WebSocketTransport::new().open(&url, sink);
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[tokio::test]
    async fn test_handshake_failure_reports_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let (sink, rx) = terminal_sink();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/app/key")).expect("url");

        let _handle = WebSocketTransport::new().open(&url, sink).expect("open");

        assert_eq!(rx.await.expect("terminal"), "error true");
    }

    #[tokio::test]
    async fn test_close_before_handshake_reports_local_close() {
        // Accepts TCP but never answers the handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let (sink, rx) = terminal_sink();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/app/key")).expect("url");

        let handle = WebSocketTransport::new().open(&url, sink).expect("open");
        handle.close();

        assert_eq!(rx.await.expect("terminal"), "close 1000 remote=false");
        drop(listener);
    }

    #[tokio::test]
    async fn test_send_after_loop_ended_fails() {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        drop(command_rx);

        let handle = WebSocketHandle { command_tx };
        assert!(matches!(handle.send("x"), Err(Error::ConnectionClosed)));
    }
}
