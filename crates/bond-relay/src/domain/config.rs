//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for runtime settings.  It is
//! built from CLI arguments / environment variables in `main.rs`, or from
//! [`Default`] in tests and local development.

use std::net::{Ipv4Addr, SocketAddr};

/// Port the relay listens on when nothing else is configured.
pub const DEFAULT_PORT: u16 = 6666;

/// Outbound messages that may queue per connection before new ones are
/// dropped for that connection.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 32;

/// All runtime configuration for the relay.
///
/// # Example
///
/// ```rust
/// use bond_relay::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 6666);
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// The relay is expected to sit behind a reverse proxy that terminates
    /// TLS and rate-limits; bind to `127.0.0.1` when the proxy is local.
    pub bind_addr: SocketAddr,

    /// Capacity of each connection's outbound queue.  Must be non-zero.
    ///
    /// Pings only ever flow relay → client, so a healthy client drains its
    /// queue almost immediately.  A stalled client fills it and further
    /// pings to that client are dropped, leaving everyone else unaffected.
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    /// | Field           | Default        |
    /// |-----------------|----------------|
    /// | bind_addr       | `0.0.0.0:6666` |
    /// | outbound_buffer | 32             |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
