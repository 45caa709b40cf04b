//! Bond relay entry point.
//!
//! Accepts WebSocket connections from client processes that share a bond
//! code and relays a `peer_ping` to every other session on the bond whenever
//! one of them sends a `sending_true` trigger.  All state is in memory: a
//! restart drops every registration and clients simply reconnect.
//!
//! Expose the port through a reverse proxy (nginx or similar) that handles
//! TLS and rate limiting.
//!
//! # Usage
//!
//! ```text
//! bond-relay [OPTIONS]
//!
//! Options:
//!   --port            <PORT>  WebSocket listener port [default: 6666]
//!   --bind            <IP>    Address to bind [default: 0.0.0.0]
//!   --outbound-buffer <N>     Per-connection outbound queue size [default: 32]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                     | Default   | Description                    |
//! |------------------------------|-----------|--------------------------------|
//! | `BOND_RELAY_PORT`            | `6666`    | WebSocket listener port        |
//! | `BOND_RELAY_BIND`            | `0.0.0.0` | Bind address                   |
//! | `BOND_RELAY_OUTBOUND_BUFFER` | `32`      | Per-connection queue capacity  |
//! | `RUST_LOG`                   | `info`    | Log filter                     |
//!
//! CLI args take precedence when both are present.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bond_relay::domain::config::{DEFAULT_OUTBOUND_BUFFER, DEFAULT_PORT};
use bond_relay::domain::RelayConfig;
use bond_relay::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Bond relay: fans peer pings out to sessions sharing a bond code.
#[derive(Debug, Parser)]
#[command(
    name = "bond-relay",
    about = "WebSocket relay that fans peer pings out to sessions sharing a bond code",
    version
)]
struct Cli {
    /// TCP port for the WebSocket listener.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "BOND_RELAY_PORT")]
    port: u16,

    /// IP address to bind the listener to.
    ///
    /// Use `127.0.0.1` when the reverse proxy runs on the same host.
    #[arg(long, default_value = "0.0.0.0", env = "BOND_RELAY_BIND")]
    bind: String,

    /// Outbound messages queued per connection before further pings to
    /// that connection are dropped.
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_BUFFER, env = "BOND_RELAY_OUTBOUND_BUFFER")]
    outbound_buffer: usize,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address or
    /// `--outbound-buffer` is zero.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        if self.outbound_buffer == 0 {
            anyhow::bail!("--outbound-buffer must be at least 1");
        }

        Ok(RelayConfig {
            bind_addr,
            outbound_buffer: self.outbound_buffer,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `RUST_LOG` controls verbosity; fall back to `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;

    info!(
        "bond relay starting: bind={}, outbound_buffer={}",
        config.bind_addr, config.outbound_buffer
    );

    // Cleared by Ctrl+C; the accept loop polls it.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("bond relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
