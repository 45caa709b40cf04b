//! Identity types used throughout the relay.
//!
//! Session ids and bond codes are opaque client-supplied tokens: the relay
//! never generates, normalises, or validates them beyond the non-empty check
//! applied at decode time.  Wrapping them in newtypes keeps the two from being
//! swapped by accident at call sites like
//! [`ConnectionRegistry::peers_of`](crate::ConnectionRegistry::peers_of).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-process client token distinguishing one connecting client instance
/// from another.  Chosen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Shared secret grouping the sessions that should notify one another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BondCode(String);

impl BondCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BondCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BondCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BondCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Relay-assigned identity of one accepted connection.
///
/// Two handles refer to the same live connection exactly when their
/// `ConnectionId`s are equal.  This is what
/// [`ConnectionRegistry::remove_by_connection`](crate::ConnectionRegistry::remove_by_connection)
/// matches on when a socket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random (UUID v4) connection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let id = SessionId::new("A");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"A\"");
    }

    #[test]
    fn test_bond_code_accepts_non_ascii_verbatim() {
        let code = BondCode::from("ボンド-✓");
        assert_eq!(code.as_str(), "ボンド-✓");
        assert_eq!(code.to_string(), "ボンド-✓");
    }

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_connection_id_round_trips_through_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(ConnectionId::from_uuid(uuid).as_uuid(), uuid);
    }
}
