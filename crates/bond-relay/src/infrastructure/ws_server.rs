//! WebSocket server: accept loop and per-connection task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Running two tasks per connection:
//!    - **Reader**: hands every text/binary frame to
//!      [`Dispatcher::on_message`] and calls [`Dispatcher::on_close`] when
//!      the stream ends, whatever the reason.
//!    - **Writer**: drains the connection's [`ChannelSink`] queue into the
//!      WebSocket sink.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Fault isolation
//!
//! Each connection runs in its own Tokio task.  A handshake failure, read
//! error, or even a panic inside one connection's task ends that connection
//! only; the accept loop and every other connection carry on.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use bond_core::{ConnectionId, Dispatcher, PeerHandle};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    WebSocketStream,
};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::config::RelayConfig;
use crate::infrastructure::channel_sink::ChannelSink;

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// How long `accept()` may wait before the loop re-checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves connections until `running` is
/// cleared.  Starts with an empty registry.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    info!("listening on ws://{}", config.bind_addr);

    serve(listener, Dispatcher::with_empty_registry(), config, running).await
}

/// Runs the accept loop on an already-bound listener.
///
/// Separate from [`run_server`] so tests can bind an ephemeral port and keep
/// a clone of the dispatcher to inspect the registry.
///
/// # Errors
///
/// Currently never returns an error; transient accept failures are logged
/// and the loop continues.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    config: RelayConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let outbound_buffer = config.outbound_buffer;

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(handle_connection(
                    stream,
                    peer_addr,
                    dispatcher,
                    outbound_buffer,
                ));
            }
            Ok(Err(e)) => {
                // e.g. too many open file descriptors; keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within ACCEPT_POLL; re-check the flag.
            }
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Entry point of each per-connection task: wraps [`run_connection`] in a
/// span carrying the remote address and logs how the connection ended.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    dispatcher: Dispatcher,
    outbound_buffer: usize,
) {
    let span = info_span!("client", peer = %peer_addr);
    async move {
        info!("client connected");
        match run_connection(stream, &dispatcher, outbound_buffer).await {
            Ok(()) => info!("client disconnected"),
            Err(e) => warn!("client disconnected with error: {e:#}"),
        }
    }
    .instrument(span)
    .await
}

/// Runs one connection from handshake to close.
///
/// `on_close` is called on every exit path after the handshake, including
/// read errors, so no registry entry outlives its socket.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails or the read side fails
/// with something other than an ordinary close.
async fn run_connection(
    stream: TcpStream,
    dispatcher: &Dispatcher,
    outbound_buffer: usize,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;

    let connection_id = ConnectionId::new();
    debug!(%connection_id, "WebSocket session established");

    let (sink, outbound_rx) = ChannelSink::new(connection_id, outbound_buffer);
    let handle: PeerHandle = Arc::new(sink);

    let (ws_tx, ws_rx) = ws_stream.split();
    let writer = tokio::spawn(write_outbound(ws_tx, outbound_rx).in_current_span());

    let result = read_inbound(ws_rx, &handle, dispatcher).await;

    let removed = dispatcher.on_close(connection_id);
    if !removed.is_empty() {
        debug!(sessions = removed.len(), "registry entries removed");
    }
    writer.abort();

    result
}

/// Feeds every data frame into the dispatcher until the client goes away.
async fn read_inbound(
    mut ws_rx: WsSource,
    handle: &PeerHandle,
    dispatcher: &Dispatcher,
) -> anyhow::Result<()> {
    while let Some(frame) = ws_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                debug!("WebSocket closed without a close handshake");
                break;
            }
            Err(e) => return Err(e).context("WebSocket read failed"),
        };

        match frame {
            WsMessage::Text(text) => {
                let outcome = dispatcher.on_message(handle, text.as_bytes());
                debug!(?outcome, "text frame dispatched");
            }
            WsMessage::Binary(data) => {
                // Some clients send JSON in binary frames; treat them alike.
                let outcome = dispatcher.on_message(handle, &data);
                debug!(?outcome, "binary frame dispatched");
            }
            WsMessage::Ping(data) => {
                // tungstenite queues the Pong reply itself.
                debug!("WebSocket ping ({} bytes)", data.len());
            }
            WsMessage::Pong(_) => debug!("WebSocket pong received"),
            WsMessage::Close(frame) => {
                debug!(?frame, "WebSocket Close frame received");
                break;
            }
            WsMessage::Frame(_) => debug!("raw frame (ignored)"),
        }
    }

    Ok(())
}

/// Drains this connection's outbound queue into the WebSocket.
///
/// Ends when every `ChannelSink` clone has been dropped or the socket
/// rejects a write; dropping `outbound_rx` then marks the sink closed.
async fn write_outbound(mut ws_tx: WsSink, mut outbound_rx: mpsc::Receiver<String>) {
    while let Some(text) = outbound_rx.recv().await {
        if let Err(e) = ws_tx.send(WsMessage::Text(text)).await {
            debug!("WebSocket send failed (client gone): {e}");
            return;
        }
    }
    let _ = ws_tx.close().await;
}
