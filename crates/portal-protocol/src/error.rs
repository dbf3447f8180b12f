//! Error types for the protocol layer.
//!
//! Each crate in Portal defines its own error enum. When you see a
//! `ProtocolError`, the problem is in parsing or serializing, not in
//! networking or room management.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into text).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, or a
    /// `text_update` without `content`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room identifier that is not exactly six ASCII digits.
    #[error("malformed room identifier: {0:?}")]
    MalformedIdentifier(String),
}
