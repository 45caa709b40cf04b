//! JSON codec for relay messages.
//!
//! Decoding is deliberately forgiving about *shape* and strict about
//! *syntax*:
//!
//! - Bytes that are not UTF-8, or text that is not JSON, are a
//!   [`ProtocolError`].  The caller logs and discards the message.
//! - Any JSON value that parses is accepted.  Fields are read by name and
//!   only string values count; a number, `null`, or an empty string in
//!   `bond_code` / `session_id` means the message does not identify a session.

use serde_json::Value;
use thiserror::Error;

use crate::domain::session::{BondCode, SessionId};
use crate::protocol::messages::{InboundMessage, MessageKind, OutboundMessage, SessionBinding};

/// Errors that can occur while decoding or encoding a message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame payload is not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The text could not be parsed (or produced) as JSON.
    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one inbound frame payload into an [`InboundMessage`].
///
/// # Errors
///
/// Returns [`ProtocolError`] if `raw` is not UTF-8 or not JSON.
///
/// # Examples
///
/// ```rust
/// use bond_core::protocol::{decode_inbound, InboundMessage};
///
/// let raw = br#"{"type":"sending_true","bond_code":"1234","session_id":"A"}"#;
/// match decode_inbound(raw).unwrap() {
///     InboundMessage::Registered { binding, kind } => {
///         assert_eq!(binding.session_id.as_str(), "A");
///         assert!(kind.is_trigger());
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn decode_inbound(raw: &[u8]) -> Result<InboundMessage, ProtocolError> {
    let text = std::str::from_utf8(raw)?;
    let body: Value = serde_json::from_str(text)?;

    let kind = MessageKind::from_type(string_field(&body, "type"));
    let session_id = non_empty_field(&body, "session_id").map(SessionId::from);
    let bond_code = non_empty_field(&body, "bond_code").map(BondCode::from);

    let message = match (session_id, bond_code) {
        (Some(session_id), Some(bond_code)) => InboundMessage::Registered {
            binding: SessionBinding {
                session_id,
                bond_code,
            },
            kind,
        },
        _ => InboundMessage::Unregistered { kind, body },
    };

    Ok(message)
}

/// Encodes an [`OutboundMessage`] as a JSON text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] if serialization fails.
pub fn encode_outbound(msg: &OutboundMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}

// ── Field helpers ─────────────────────────────────────────────────────────────

/// `body[name]` if `body` is an object and the field holds a string.
fn string_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

fn non_empty_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    string_field(body, name).filter(|value| !value.is_empty())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registered(raw: &[u8]) -> (SessionBinding, MessageKind) {
        match decode_inbound(raw).expect("decode must succeed") {
            InboundMessage::Registered { binding, kind } => (binding, kind),
            other => panic!("expected Registered, got {other:?}"),
        }
    }

    fn is_unregistered(raw: &[u8]) -> bool {
        matches!(
            decode_inbound(raw).expect("decode must succeed"),
            InboundMessage::Unregistered { .. }
        )
    }

    #[test]
    fn test_decode_trigger() {
        let (binding, kind) =
            registered(br#"{"type":"sending_true","bond_code":"1234","session_id":"A"}"#);

        assert_eq!(binding.session_id, SessionId::from("A"));
        assert_eq!(binding.bond_code, BondCode::from("1234"));
        assert_eq!(kind, MessageKind::Trigger);
    }

    #[test]
    fn test_decode_ignores_unknown_fields_and_order() {
        let (binding, kind) = registered(
            br#"{"extra":[1,2,3],"session_id":"B","type":"hello","bond_code":"x"}"#,
        );

        assert_eq!(binding.session_id.as_str(), "B");
        assert_eq!(kind, MessageKind::Other("hello".to_string()));
    }

    #[test]
    fn test_decode_missing_type_is_unknown_but_still_registers() {
        let (_, kind) = registered(br#"{"bond_code":"1234","session_id":"A"}"#);
        assert_eq!(kind.as_str(), "unknown");
    }

    #[test]
    fn test_decode_empty_session_id_is_unregistered() {
        assert!(is_unregistered(
            br#"{"type":"sending_true","bond_code":"1234","session_id":""}"#
        ));
    }

    #[test]
    fn test_decode_missing_bond_code_is_unregistered() {
        assert!(is_unregistered(br#"{"type":"sending_true","session_id":"A"}"#));
    }

    #[test]
    fn test_decode_non_string_fields_are_treated_as_absent() {
        assert!(is_unregistered(br#"{"bond_code":1234,"session_id":"A"}"#));
        assert!(is_unregistered(br#"{"bond_code":"1234","session_id":null}"#));
    }

    #[test]
    fn test_decode_json_scalar_is_unregistered() {
        assert!(is_unregistered(b"42"));
        assert!(is_unregistered(br#""sending_true""#));
    }

    #[test]
    fn test_decode_unregistered_keeps_body_for_logging() {
        match decode_inbound(br#"{"type":"hello"}"#).unwrap() {
            InboundMessage::Unregistered { kind, body } => {
                assert_eq!(kind.as_str(), "hello");
                assert_eq!(body, json!({"type": "hello"}));
            }
            other => panic!("expected Unregistered, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_inbound(b"not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode_inbound(&[0xFF, 0xFE, b'{']).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8(_)));
    }

    #[test]
    fn test_encode_peer_ping() {
        let msg = OutboundMessage::PeerPing {
            bond_code: BondCode::from("1234"),
            from_session: SessionId::from("A"),
        };

        let text = encode_outbound(&msg).unwrap();

        assert_eq!(
            text,
            r#"{"type":"peer_ping","bond_code":"1234","from_session":"A"}"#
        );
    }
}
