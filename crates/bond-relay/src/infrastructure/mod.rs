//! Infrastructure layer for bond-relay.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and performing the WebSocket upgrade
//! - Spawning a reader task and a writer task per connection
//! - Giving each connection a non-blocking outbound queue ([`ChannelSink`])
//! - Reporting frames and close events to the [`bond_core::Dispatcher`]
//! - Handling the graceful shutdown signal
//!
//! Message classification, registry updates and fan-out live in `bond-core`.

pub mod channel_sink;
pub mod ws_server;

pub use channel_sink::ChannelSink;
pub use ws_server::{run_server, serve};
