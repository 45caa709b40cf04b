//! # bond-core
//!
//! Shared library for the bond relay containing the JSON wire protocol, the
//! in-memory connection registry, and the dispatcher that fans trigger
//! events out to peer sessions.
//!
//! This crate has zero dependencies on sockets or async runtimes.  The
//! transport layer (see the `bond-relay` crate) owns the listener and calls
//! into the [`Dispatcher`] through exactly two entry points per connection:
//! [`Dispatcher::on_message`] and [`Dispatcher::on_close`].
//!
//! # Architecture overview
//!
//! Clients that share a secret *bond code* want to notify each other when a
//! local event happens.  Each client process connects to the relay, sends
//! JSON messages carrying its bond code and a per-process *session id*, and
//! may send a trigger (`{"type":"sending_true", ...}`).  The relay answers a
//! trigger by sending a `peer_ping` to every other session on the same bond.
//!
//! - **`protocol`** – Inbound decode (bytes → [`InboundMessage`]) and
//!   outbound encode ([`OutboundMessage`] → JSON text).
//!
//! - **`domain`** – Identity newtypes, the [`PeerSink`] handle abstraction,
//!   and the [`ConnectionRegistry`] itself.
//!
//! - **`dispatch`** – The [`Dispatcher`]: classifies each inbound message,
//!   refreshes the registry, and performs fan-out.

pub mod dispatch;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `bond_core::Dispatcher` instead of `bond_core::dispatch::dispatcher::Dispatcher`.
pub use dispatch::{DispatchOutcome, Dispatcher, FanOutReport, SharedRegistry};
pub use domain::peer::{PeerHandle, PeerSink, SendError};
pub use domain::registry::{ConnectionRegistry, Peer, Registration, UpsertKind, UpsertOutcome};
pub use domain::session::{BondCode, ConnectionId, SessionId};
pub use protocol::codec::{decode_inbound, encode_outbound, ProtocolError};
pub use protocol::messages::{InboundMessage, MessageKind, OutboundMessage, SessionBinding};
