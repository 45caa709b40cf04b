//! Dispatcher: the relay's per-message business logic.
//!
//! The transport calls two entry points per connection:
//!
//! ```text
//! frame received   →  Dispatcher::on_message(&handle, bytes)
//! socket closed    →  Dispatcher::on_close(connection_id)
//! ```
//!
//! # Message handling
//!
//! ```text
//! bytes ──decode──► Err            → Malformed   (warn, discard)
//!                   Unregistered   → Ignored     (info, no state change)
//!                   Registered     → upsert ──► kind == Trigger ? fan out : Registered
//! ```
//!
//! # Locking
//!
//! The registry sits behind a `std::sync::Mutex`.  Every critical section is
//! a single registry call, so the lock is never held across a send: fan-out
//! snapshots the peer list, releases the lock, then pushes to each handle.
//! A poisoned lock is recovered instead of propagated; the registry has no
//! multi-step invariants a panic could leave half-applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::domain::peer::PeerHandle;
use crate::domain::registry::{ConnectionRegistry, UpsertKind};
use crate::domain::session::{ConnectionId, SessionId};
use crate::protocol::codec::{decode_inbound, encode_outbound};
use crate::protocol::messages::{InboundMessage, OutboundMessage, SessionBinding};

/// The registry as shared between connection tasks.
pub type SharedRegistry = Arc<Mutex<ConnectionRegistry>>;

/// Per-trigger delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Pings queued on a peer connection.
    pub delivered: usize,
    /// Peers whose connection was already closed; no send attempted.
    pub skipped: usize,
    /// Peers whose send failed.
    pub failed: usize,
}

impl FanOutReport {
    pub fn recipients(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// What [`Dispatcher::on_message`] did with one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not UTF-8 JSON; discarded.
    Malformed,
    /// Valid JSON without a usable `bond_code` + `session_id`; ignored.
    Ignored,
    /// Registry refreshed; no fan-out for this `type`.
    Registered,
    /// Registry refreshed and a trigger fanned out.
    FannedOut(FanOutReport),
}

/// Routes inbound messages to the registry and fans triggers out to peers.
///
/// Cloning a `Dispatcher` is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
}

impl Dispatcher {
    /// Creates a dispatcher over an explicitly owned registry.
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Creates a dispatcher with a fresh, empty registry.
    pub fn with_empty_registry() -> Self {
        Self::new(Arc::new(Mutex::new(ConnectionRegistry::new())))
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Number of sessions currently registered.
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Handles one inbound frame received on `handle`'s connection.
    ///
    /// Never fails: every error is logged and confined to this frame.
    pub fn on_message(&self, handle: &PeerHandle, raw: &[u8]) -> DispatchOutcome {
        let inbound = match decode_inbound(raw) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(
                    error = %e,
                    body = %String::from_utf8_lossy(raw),
                    "non-JSON message discarded"
                );
                return DispatchOutcome::Malformed;
            }
        };

        match inbound {
            InboundMessage::Unregistered { kind, body } => {
                info!(msg_type = %kind, %body, "message without bond_code/session_id");
                DispatchOutcome::Ignored
            }
            InboundMessage::Registered { binding, kind } => {
                self.register(&binding, handle);
                info!(
                    bond_code = %binding.bond_code,
                    session = %binding.session_id,
                    msg_type = %kind,
                    "registration refreshed"
                );

                if kind.is_trigger() {
                    DispatchOutcome::FannedOut(self.fan_out(&binding))
                } else {
                    DispatchOutcome::Registered
                }
            }
        }
    }

    /// Forgets every session registered by the closing connection.
    ///
    /// Returns the removed session ids; empty when the connection never
    /// registered (or was superseded).
    pub fn on_close(&self, connection_id: ConnectionId) -> Vec<SessionId> {
        let removed = self.lock().remove_by_connection(connection_id);
        for session_id in &removed {
            debug!(session = %session_id, %connection_id, "session removed on close");
        }
        removed
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn register(&self, binding: &SessionBinding, handle: &PeerHandle) {
        let outcome = self.lock().upsert(
            binding.session_id.clone(),
            binding.bond_code.clone(),
            Arc::clone(handle),
        );

        if let UpsertKind::Rebonded { previous } = &outcome.kind {
            // Any registration-bearing message may move a session to another
            // bond; there is no authentication to stop it.
            info!(
                session = %binding.session_id,
                from = %previous,
                to = %binding.bond_code,
                "session changed bond code"
            );
        }
        for stale in &outcome.evicted {
            debug!(
                session = %stale,
                replaced_by = %binding.session_id,
                "connection re-registered; old session dropped"
            );
        }
    }

    fn fan_out(&self, binding: &SessionBinding) -> FanOutReport {
        let peers = self
            .lock()
            .peers_of(&binding.bond_code, &binding.session_id);

        let mut report = FanOutReport::default();
        if peers.is_empty() {
            debug!(bond_code = %binding.bond_code, "trigger has no peers");
            return report;
        }

        let text = match encode_outbound(&OutboundMessage::peer_ping(binding)) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to encode peer_ping: {e}");
                report.failed = peers.len();
                return report;
            }
        };

        for peer in peers {
            if !peer.handle.is_open() {
                debug!(session = %peer.session_id, "peer connection closed; skipping");
                report.skipped += 1;
                continue;
            }

            match peer.handle.try_send(&text) {
                Ok(()) => {
                    report.delivered += 1;
                    info!(
                        session = %peer.session_id,
                        bond_code = %binding.bond_code,
                        "pinged session"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(session = %peer.session_id, error = %e, "failed to ping session");
                }
            }
        }

        report
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
