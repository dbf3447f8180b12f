//! Error types for the room layer.

use portal_protocol::{RoomCode, SessionId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The session is already a member of this room.
    #[error("session {0} already in room {1}")]
    AlreadyMember(SessionId, RoomCode),

    /// The session is not a member of this room.
    #[error("session {0} not in room {1}")]
    NotMember(SessionId, RoomCode),

    /// The room's actor has stopped (reaped or shut down).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// Every one of the 1,000,000 room codes is in use.
    #[error("no free room codes left")]
    CodeSpaceExhausted,
}
