//! Core protocol types for Portal's wire format.
//!
//! Everything in this module travels "on the wire": it is serialized,
//! sent to a browser or the server, and deserialized on the other side.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A six-digit room identifier such as `"482913"` or `"000071"`.
///
/// Stored as the numeric value so it is `Copy` and cheap to use as a map
/// key, but it only ever appears on the wire as a zero-padded string. The
/// only ways to build one are [`RoomCode::parse`] (exactly six ASCII
/// digits) and [`RoomCode::from_index`] (a value below [`RoomCode::SPACE`]),
/// so every `RoomCode` in the process is valid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(u32);

impl RoomCode {
    /// Number of digits in every room code.
    pub const LEN: usize = 6;

    /// Size of the identifier space (`000000` through `999999`).
    pub const SPACE: u32 = 1_000_000;

    /// Parses a room code, rejecting anything that isn't exactly six ASCII
    /// digits. Signs, whitespace, and non-ASCII digits are all malformed.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if raw.len() != Self::LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::MalformedIdentifier(raw.to_string()));
        }
        let value = raw
            .bytes()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
        Ok(Self(value))
    }

    /// Builds the code for a position in the identifier space.
    ///
    /// Returns `None` when `index >= RoomCode::SPACE`.
    pub fn from_index(index: u32) -> Option<Self> {
        (index < Self::SPACE).then_some(Self(index))
    }

    /// Returns the code's position in the identifier space.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.to_string()
    }
}

/// Identifies one connection's membership inside a room hub.
///
/// Newtype over `u64` so it can't be mixed up with other counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Frame — the WebSocket message
// ---------------------------------------------------------------------------

/// A message exchanged over the real-time channel, in both directions.
///
/// `#[serde(tag = "type", rename_all = "snake_case")]` produces the
/// internally tagged shape browsers expect:
///
/// ```text
/// { "type": "text_update", "content": "hello world" }
/// ```
///
/// `content` is always the *entire* document. Updates are never diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// A full document snapshot.
    TextUpdate { content: String },
}

impl Frame {
    /// Convenience constructor for [`Frame::TextUpdate`].
    pub fn text_update(content: impl Into<String>) -> Self {
        Self::TextUpdate {
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP payloads
// ---------------------------------------------------------------------------

/// Body of the room creation response: `{ "roomID": "482913" }`.
///
/// The field is optional on the decoding side so that a response without
/// it can be reported as a creation failure instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    #[serde(
        rename = "roomID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub room_id: Option<RoomCode>,
}

/// Body of the existence check: `{ "exists": true }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomExistsResponse {
    pub exists: bool,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser editor parses these exact JSON shapes, so a mismatch in
    //! serde attributes breaks every client.

    use super::*;

    // =====================================================================
    // RoomCode
    // =====================================================================

    #[test]
    fn test_room_code_parse_accepts_six_digits() {
        let code = RoomCode::parse("482913").unwrap();
        assert_eq!(code.index(), 482_913);
        assert_eq!(code.to_string(), "482913");
    }

    #[test]
    fn test_room_code_keeps_leading_zeros() {
        let code = RoomCode::parse("000071").unwrap();
        assert_eq!(code.index(), 71);
        assert_eq!(code.to_string(), "000071");
    }

    #[test]
    fn test_room_code_parse_rejects_malformed() {
        for raw in ["", "12345", "1234567", "12a456", "+12345", " 12345", "１２３４５６"] {
            assert!(
                matches!(
                    RoomCode::parse(raw),
                    Err(ProtocolError::MalformedIdentifier(_))
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_room_code_from_index_bounds() {
        assert_eq!(RoomCode::from_index(0).unwrap().to_string(), "000000");
        assert_eq!(RoomCode::from_index(999_999).unwrap().to_string(), "999999");
        assert!(RoomCode::from_index(RoomCode::SPACE).is_none());
    }

    #[test]
    fn test_room_code_serializes_as_string() {
        let json = serde_json::to_string(&RoomCode::parse("000042").unwrap()).unwrap();
        assert_eq!(json, "\"000042\"");
    }

    #[test]
    fn test_room_code_deserialize_rejects_number() {
        let result: Result<RoomCode, _> = serde_json::from_str("482913");
        assert!(result.is_err());
    }

    #[test]
    fn test_room_code_deserialize_rejects_short_string() {
        let result: Result<RoomCode, _> = serde_json::from_str("\"4829\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(7).to_string(), "S-7");
    }

    // =====================================================================
    // Frame
    // =====================================================================

    #[test]
    fn test_text_update_json_format() {
        let json = serde_json::to_value(Frame::text_update("hello")).unwrap();
        assert_eq!(json["type"], "text_update");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn test_text_update_parses_browser_frame() {
        let frame: Frame =
            serde_json::from_str(r#"{"type":"text_update","content":"hello world"}"#)
                .unwrap();
        assert_eq!(frame, Frame::text_update("hello world"));
    }

    #[test]
    fn test_text_update_ignores_extra_fields() {
        let frame: Frame = serde_json::from_str(
            r#"{"type":"text_update","content":"x","cursor":4}"#,
        )
        .unwrap();
        assert_eq!(frame, Frame::text_update("x"));
    }

    #[test]
    fn test_text_update_without_content_is_rejected() {
        let result: Result<Frame, _> =
            serde_json::from_str(r#"{"type":"text_update"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_frame_type_is_rejected() {
        let result: Result<Frame, _> =
            serde_json::from_str(r#"{"type":"presence","user":"a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_string_content_is_rejected() {
        let result: Result<Frame, _> =
            serde_json::from_str(r#"{"type":"text_update","content":42}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // HTTP payloads
    // =====================================================================

    #[test]
    fn test_create_room_response_uses_room_id_key() {
        let resp = CreateRoomResponse {
            room_id: Some(RoomCode::parse("482913").unwrap()),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"roomID":"482913"}"#);
    }

    #[test]
    fn test_create_room_response_missing_field_decodes_to_none() {
        let resp: CreateRoomResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.room_id, None);
    }

    #[test]
    fn test_room_exists_response_json_format() {
        let json = serde_json::to_string(&RoomExistsResponse { exists: false }).unwrap();
        assert_eq!(json, r#"{"exists":false}"#);
    }
}
