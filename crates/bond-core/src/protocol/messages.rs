//! JSON message types for the relay's WebSocket protocol.
//!
//! # Message flow
//!
//! ```text
//! Client → Relay:  JSON text  →  InboundMessage   (decode_inbound)
//! Relay  → Client: OutboundMessage  →  JSON text  (encode_outbound)
//! ```
//!
//! Inbound JSON is loosely shaped: any object may carry `type`, `bond_code`
//! and `session_id`, and unknown fields are ignored.  The decoder turns that
//! into the closed [`InboundMessage`] enum so business logic only ever
//! branches on two cases: the message identifies a session, or it doesn't.
//!
//! ```json
//! {"type":"sending_true","bond_code":"1234","session_id":"A"}
//! ```
//!
//! Outbound traffic is a single message kind:
//!
//! ```json
//! {"type":"peer_ping","bond_code":"1234","from_session":"A"}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::session::{BondCode, SessionId};

/// `type` value of the trigger message that causes fan-out.
pub const TRIGGER_TYPE: &str = "sending_true";

/// `type` value of the relay's only outbound message.
pub const PEER_PING_TYPE: &str = "peer_ping";

/// Label recorded when an inbound message has no string `type` field.
pub const UNKNOWN_TYPE: &str = "unknown";

// ── Inbound ───────────────────────────────────────────────────────────────────

/// The `type` field of an inbound message, reduced to what the relay acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// `"sending_true"`: fan a peer ping out to the rest of the bond.
    Trigger,
    /// Any other value, kept only for logging.  Absent → `"unknown"`.
    Other(String),
}

impl MessageKind {
    /// Classifies a raw `type` value.
    pub fn from_type(value: Option<&str>) -> Self {
        match value {
            Some(TRIGGER_TYPE) => Self::Trigger,
            Some(other) => Self::Other(other.to_owned()),
            None => Self::Other(UNKNOWN_TYPE.to_owned()),
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Trigger => TRIGGER_TYPE,
            Self::Other(value) => value.as_str(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (session, bond) pair carried by a registration-bearing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    pub session_id: SessionId,
    pub bond_code: BondCode,
}

/// A structurally valid inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Carries a non-empty `bond_code` and `session_id`.  Always refreshes
    /// the registry; fans out when `kind` is [`MessageKind::Trigger`].
    Registered {
        binding: SessionBinding,
        kind: MessageKind,
    },

    /// Parsed fine but does not identify a session.  Logged and ignored,
    /// even when `kind` is the trigger.
    Unregistered {
        kind: MessageKind,
        body: serde_json::Value,
    },
}

impl InboundMessage {
    pub fn kind(&self) -> &MessageKind {
        match self {
            Self::Registered { kind, .. } | Self::Unregistered { kind, .. } => kind,
        }
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Every message the relay originates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Another session on the bond sent a trigger.
    #[serde(rename = "peer_ping")]
    PeerPing {
        bond_code: BondCode,
        from_session: SessionId,
    },
}

impl OutboundMessage {
    pub fn peer_ping(binding: &SessionBinding) -> Self {
        Self::PeerPing {
            bond_code: binding.bond_code.clone(),
            from_session: binding.session_id.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
