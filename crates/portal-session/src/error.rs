//! Error types for the session layer.

use portal_protocol::{ProtocolError, RoomCode};
use portal_room::RoomError;

use crate::SessionState;

/// Errors that can occur while admitting or running a session.
///
/// The first two are rejections: the connection never gets upgraded, so the
/// peer sees it close before it ever opened.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The requested room identifier is missing or not six digits.
    #[error("malformed room identifier: {0:?}")]
    MalformedIdentifier(String),

    /// No open room has this identifier.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The session was driven out of order (e.g. run before validate).
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    /// The room hub refused or went away.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An outbound frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// Returns `true` for errors that mean "this room can't be joined".
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::MalformedIdentifier(_) | Self::RoomNotFound(_))
    }
}
