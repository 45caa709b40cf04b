//! Domain layer: identities, connection handles, and the session registry.
//!
//! Nothing in here performs I/O.  Connection handles are abstract
//! ([`peer::PeerSink`]) so the registry can be exercised in tests with fake
//! sinks and driven in production by channel-backed WebSocket writers.

pub mod peer;
pub mod registry;
pub mod session;

pub use peer::{PeerHandle, PeerSink, SendError};
pub use registry::ConnectionRegistry;
pub use session::{BondCode, ConnectionId, SessionId};
