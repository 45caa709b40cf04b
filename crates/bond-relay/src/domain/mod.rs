//! Domain layer for bond-relay.
//!
//! Plain configuration types with no dependency on tokio or sockets.  Parsing
//! the command line and environment happens in `main.rs`; everything below it
//! only ever sees a finished [`RelayConfig`].

pub mod config;

pub use config::RelayConfig;
