//! Abstract handle to one live client connection.
//!
//! The registry never touches sockets.  It stores a [`PeerHandle`] per
//! session and hands clones of it to the dispatcher, which pushes outbound
//! text through [`PeerSink::try_send`].  The transport decides what a send
//! actually does; in `bond-relay` it enqueues onto a bounded per-connection
//! channel drained by that connection's writer task.

use std::sync::Arc;

use thiserror::Error;

use super::session::ConnectionId;

/// Why a single outbound send did not go through.
///
/// Send failures are always local to one recipient: the dispatcher logs them
/// and moves on to the next peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection has closed (or its writer has gone away).
    #[error("connection closed")]
    Closed,

    /// The connection's outbound buffer is full; the message was dropped.
    #[error("outbound buffer full")]
    Full,
}

/// Write side of a client connection as seen by the core.
///
/// Implementations must never block: `try_send` either queues the text or
/// reports a [`SendError`] immediately, so one stalled peer cannot hold up a
/// fan-out to the others.
#[cfg_attr(test, mockall::automock)]
pub trait PeerSink: Send + Sync {
    /// Identity of the underlying connection.
    fn connection_id(&self) -> ConnectionId;

    /// `false` once the connection is known to be closed.
    fn is_open(&self) -> bool;

    /// Queues one UTF-8 text message for delivery.
    fn try_send(&self, text: &str) -> Result<(), SendError>;
}

/// Shared, cheaply clonable connection handle stored in the registry.
pub type PeerHandle = Arc<dyn PeerSink>;
