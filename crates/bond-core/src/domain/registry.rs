//! ConnectionRegistry: the relay's in-memory table of live sessions.
//!
//! Each entry maps a client-chosen [`SessionId`] to the [`BondCode`] it last
//! registered under and the [`PeerHandle`] of the connection it last spoke
//! on.
//!
//! # Invariants
//!
//! - At most one entry per session id.  A later [`upsert`] for the same id
//!   overwrites bond code and handle; it never creates a duplicate.
//! - A connection owns at most one entry.  When a connection registers under
//!   a new session id, whatever it held under an older id is evicted.
//! - There is no secondary index by bond code.  [`peers_of`] scans every
//!   entry, which is fine for the expected population (bonds of two, a
//!   modest number of concurrent sessions).
//!
//! The registry itself is not synchronised; the dispatcher wraps it in a
//! mutex so every mutation is atomic with respect to concurrent scans.
//!
//! [`upsert`]: ConnectionRegistry::upsert
//! [`peers_of`]: ConnectionRegistry::peers_of

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::peer::PeerHandle;
use super::session::{BondCode, ConnectionId, SessionId};

/// The registry's value for one session.
#[derive(Clone)]
pub struct Registration {
    pub bond_code: BondCode,
    pub handle: PeerHandle,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("bond_code", &self.bond_code)
            .field("connection_id", &self.handle.connection_id())
            .finish()
    }
}

/// One fan-out recipient returned by [`ConnectionRegistry::peers_of`].
#[derive(Clone)]
pub struct Peer {
    pub session_id: SessionId,
    pub handle: PeerHandle,
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("session_id", &self.session_id)
            .field("connection_id", &self.handle.connection_id())
            .finish()
    }
}

/// What an [`upsert`](ConnectionRegistry::upsert) did to the session's entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertKind {
    /// No entry existed for the session id.
    Inserted,
    /// The entry existed with the same bond code; the handle was replaced.
    Refreshed,
    /// The entry existed under a different bond code.
    Rebonded { previous: BondCode },
}

/// Result of an upsert, used by the dispatcher for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub kind: UpsertKind,
    /// Older session ids the same connection held, now dropped.
    pub evicted: Vec<SessionId>,
}

/// In-memory mapping `session_id → { bond_code, connection handle }`.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: HashMap<SessionId, Registration>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry for `session_id`.
    ///
    /// Never fails.  A previous handle under the same session id is dropped
    /// from the registry but not closed; closing is the transport's job.
    pub fn upsert(
        &mut self,
        session_id: SessionId,
        bond_code: BondCode,
        handle: PeerHandle,
    ) -> UpsertOutcome {
        let connection_id = handle.connection_id();

        let mut evicted = Vec::new();
        self.entries.retain(|sid, reg| {
            let stale = *sid != session_id && reg.handle.connection_id() == connection_id;
            if stale {
                evicted.push(sid.clone());
            }
            !stale
        });

        let previous = self.entries.insert(
            session_id,
            Registration {
                bond_code: bond_code.clone(),
                handle,
            },
        );

        let kind = match previous {
            None => UpsertKind::Inserted,
            Some(prev) if prev.bond_code == bond_code => UpsertKind::Refreshed,
            Some(prev) => UpsertKind::Rebonded {
                previous: prev.bond_code,
            },
        };

        UpsertOutcome { kind, evicted }
    }

    /// Returns every session registered under `bond_code` except `excluding`.
    ///
    /// Order is unspecified.  This is a full scan: O(total sessions).
    pub fn peers_of(&self, bond_code: &BondCode, excluding: &SessionId) -> Vec<Peer> {
        self.entries
            .iter()
            .filter(|(sid, reg)| reg.bond_code == *bond_code && *sid != excluding)
            .map(|(sid, reg)| Peer {
                session_id: sid.clone(),
                handle: Arc::clone(&reg.handle),
            })
            .collect()
    }

    /// Deletes every entry whose handle belongs to `connection_id` and
    /// returns the removed session ids.  No match is a no-op.
    pub fn remove_by_connection(&mut self, connection_id: ConnectionId) -> Vec<SessionId> {
        let mut removed = Vec::new();
        self.entries.retain(|sid, reg| {
            let owned = reg.handle.connection_id() == connection_id;
            if owned {
                removed.push(sid.clone());
            }
            !owned
        });
        removed
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&Registration> {
        self.entries.get(session_id)
    }

    /// Bond code the session is currently registered under, if any.
    pub fn bond_code_of(&self, session_id: &SessionId) -> Option<&BondCode> {
        self.entries.get(session_id).map(|reg| &reg.bond_code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peer::MockPeerSink;

    /// Builds a handle whose only observable behaviour is its connection id.
    fn handle(connection_id: ConnectionId) -> PeerHandle {
        let mut sink = MockPeerSink::new();
        sink.expect_connection_id().return_const(connection_id);
        Arc::new(sink)
    }

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    fn bond(s: &str) -> BondCode {
        BondCode::from(s)
    }

    fn peer_ids(peers: &[Peer]) -> Vec<String> {
        let mut ids: Vec<String> = peers.iter().map(|p| p.session_id.to_string()).collect();
        ids.sort();
        ids
    }

    // ── upsert ────────────────────────────────────────────────────────────────

    #[test]
    fn test_upsert_new_session_is_inserted() {
        let mut registry = ConnectionRegistry::new();

        let outcome = registry.upsert(sid("A"), bond("1234"), handle(ConnectionId::new()));

        assert_eq!(outcome.kind, UpsertKind::Inserted);
        assert!(outcome.evicted.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_same_session_twice_keeps_one_entry() {
        // Arrange
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        registry.upsert(sid("A"), bond("1234"), handle(conn));

        // Act
        let outcome = registry.upsert(sid("A"), bond("1234"), handle(conn));

        // Assert
        assert_eq!(outcome.kind, UpsertKind::Refreshed);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_latest_registration_wins() {
        let mut registry = ConnectionRegistry::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();
        registry.upsert(sid("A"), bond("1234"), handle(first));

        let outcome = registry.upsert(sid("A"), bond("4321"), handle(second));

        assert_eq!(
            outcome.kind,
            UpsertKind::Rebonded {
                previous: bond("1234")
            }
        );
        let reg = registry.get(&sid("A")).expect("entry must exist");
        assert_eq!(reg.bond_code, bond("4321"));
        assert_eq!(reg.handle.connection_id(), second);
    }

    #[test]
    fn test_upsert_new_session_on_same_connection_evicts_old_one() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        registry.upsert(sid("A"), bond("1234"), handle(conn));

        let outcome = registry.upsert(sid("A2"), bond("1234"), handle(conn));

        assert_eq!(outcome.kind, UpsertKind::Inserted);
        assert_eq!(outcome.evicted, vec![sid("A")]);
        assert!(registry.get(&sid("A")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_accepts_empty_and_unicode_tokens_verbatim() {
        // The registry is not a validation layer.
        let mut registry = ConnectionRegistry::new();
        registry.upsert(sid(""), bond(""), handle(ConnectionId::new()));
        registry.upsert(sid("séance"), bond("🔗"), handle(ConnectionId::new()));

        assert_eq!(registry.bond_code_of(&sid("")), Some(&bond("")));
        assert_eq!(registry.bond_code_of(&sid("séance")), Some(&bond("🔗")));
    }

    // ── peers_of ──────────────────────────────────────────────────────────────

    #[test]
    fn test_peers_of_excludes_the_sender() {
        let mut registry = ConnectionRegistry::new();
        registry.upsert(sid("A"), bond("1234"), handle(ConnectionId::new()));
        registry.upsert(sid("B"), bond("1234"), handle(ConnectionId::new()));

        let peers = registry.peers_of(&bond("1234"), &sid("A"));

        assert_eq!(peer_ids(&peers), vec!["B"]);
    }

    #[test]
    fn test_peers_of_ignores_other_bond_codes() {
        let mut registry = ConnectionRegistry::new();
        registry.upsert(sid("A"), bond("1234"), handle(ConnectionId::new()));
        registry.upsert(sid("B"), bond("1234"), handle(ConnectionId::new()));
        registry.upsert(sid("C"), bond("1234"), handle(ConnectionId::new()));
        registry.upsert(sid("X"), bond("9999"), handle(ConnectionId::new()));

        let peers = registry.peers_of(&bond("1234"), &sid("A"));

        assert_eq!(peer_ids(&peers), vec!["B", "C"]);
    }

    #[test]
    fn test_peers_of_lone_session_is_empty() {
        let mut registry = ConnectionRegistry::new();
        registry.upsert(sid("A"), bond("5678"), handle(ConnectionId::new()));

        assert!(registry.peers_of(&bond("5678"), &sid("A")).is_empty());
    }

    #[test]
    fn test_peers_of_unknown_bond_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.peers_of(&bond("nope"), &sid("A")).is_empty());
    }

    #[test]
    fn test_rebonded_session_moves_between_peer_sets() {
        let mut registry = ConnectionRegistry::new();
        let conn_b = ConnectionId::new();
        registry.upsert(sid("A"), bond("B-code"), handle(ConnectionId::new()));
        registry.upsert(sid("S"), bond("B-code"), handle(conn_b));
        registry.upsert(sid("Z"), bond("C-code"), handle(ConnectionId::new()));

        registry.upsert(sid("S"), bond("C-code"), handle(conn_b));

        assert!(registry.peers_of(&bond("B-code"), &sid("A")).is_empty());
        assert_eq!(
            peer_ids(&registry.peers_of(&bond("C-code"), &sid("Z"))),
            vec!["S"]
        );
    }

    // ── remove_by_connection ─────────────────────────────────────────────────

    #[test]
    fn test_remove_by_connection_drops_matching_entry() {
        let mut registry = ConnectionRegistry::new();
        let conn_a = ConnectionId::new();
        registry.upsert(sid("A"), bond("9999"), handle(conn_a));
        registry.upsert(sid("B"), bond("9999"), handle(ConnectionId::new()));

        let removed = registry.remove_by_connection(conn_a);

        assert_eq!(removed, vec![sid("A")]);
        assert!(registry.peers_of(&bond("9999"), &sid("B")).is_empty());
    }

    #[test]
    fn test_remove_by_connection_without_match_is_noop() {
        let mut registry = ConnectionRegistry::new();
        registry.upsert(sid("A"), bond("9999"), handle(ConnectionId::new()));

        let removed = registry.remove_by_connection(ConnectionId::new());

        assert!(removed.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_by_old_connection_after_reconnect_keeps_new_entry() {
        // A session that reconnected on a new socket must survive the close
        // of its old socket.
        let mut registry = ConnectionRegistry::new();
        let old_conn = ConnectionId::new();
        let new_conn = ConnectionId::new();
        registry.upsert(sid("A"), bond("1234"), handle(old_conn));
        registry.upsert(sid("A"), bond("1234"), handle(new_conn));

        let removed = registry.remove_by_connection(old_conn);

        assert!(removed.is_empty());
        assert_eq!(
            registry.get(&sid("A")).map(|r| r.handle.connection_id()),
            Some(new_conn)
        );
    }

    #[test]
    fn test_empty_registry_reports_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
