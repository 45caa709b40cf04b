//! `PeerSink` backed by a bounded tokio channel.
//!
//! The dispatcher must never wait on a slow client.  Instead of writing to
//! the WebSocket directly, it pushes text into this connection's queue with
//! `try_send`; the connection's writer task drains the queue into the socket
//! at whatever pace the client manages.
//!
//! ```text
//! Dispatcher ──try_send──► [ bounded mpsc ] ──recv──► writer task ──► WebSocket
//! ```

use bond_core::{ConnectionId, PeerSink, SendError};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Write side of one client connection.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    connection_id: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Creates the sink and the receiver its writer task should drain.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (tokio rejects zero-capacity channels).
    /// [`RelayConfig`](crate::domain::RelayConfig) values built by `main.rs`
    /// are validated before they get here.
    pub fn new(connection_id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { connection_id, tx }, rx)
    }
}

impl PeerSink for ChannelSink {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn is_open(&self) -> bool {
        // The receiver is dropped as soon as the writer task ends.
        !self.tx.is_closed()
    }

    fn try_send(&self, text: &str) -> Result<(), SendError> {
        self.tx.try_send(text.to_owned()).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
