//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and the text that
//! goes into a WebSocket frame. The session and client layers only need
//! something that implements [`Codec`]; [`JsonCodec`] is the one browsers
//! speak.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to frame text and decode bytes back.
///
/// `Send + Sync + 'static` because a codec lives inside long-running
/// session tasks that Tokio may move between worker threads.
///
/// Encoding produces a `String` since every outbound frame is a text frame.
/// Decoding takes raw bytes so inbound text and binary frames share a path.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into frame text.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes frame bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use portal_protocol::{Codec, Frame, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = Frame::text_update("hello");
///
/// let text = codec.encode(&frame).unwrap();
/// assert_eq!(text, r#"{"type":"text_update","content":"hello"}"#);
///
/// let decoded: Frame = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        // `from_slice` also rejects invalid UTF-8, which covers binary
        // frames that aren't JSON text at all.
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
