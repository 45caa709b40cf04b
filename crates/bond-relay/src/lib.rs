//! bond-relay library crate.
//!
//! The WebSocket transport around [`bond_core`]: it accepts client
//! connections, gives each one a channel-backed [`bond_core::PeerSink`], and
//! feeds every frame and close event into a shared [`bond_core::Dispatcher`].
//!
//! # Architecture
//!
//! ```text
//! Client (JSON over WebSocket)
//!         ↕
//! [bond-relay]
//!   ├── domain/           RelayConfig
//!   └── infrastructure/
//!         ├── ws_server/     accept loop + per-connection reader (tokio-tungstenite)
//!         └── channel_sink/  PeerSink backed by a bounded mpsc queue
//!         ↕
//! [bond-core]  registry + dispatcher (no I/O)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `infrastructure` owns sockets, tasks, and channels.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Infrastructure layer: WebSocket server and outbound channels.
pub mod infrastructure;
