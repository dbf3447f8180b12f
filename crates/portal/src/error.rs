//! Unified error type for Portal.

use portal_client::ClientError;
use portal_protocol::ProtocolError;
use portal_room::RoomError;
use portal_session::SessionError;
use portal_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// Binding or serving the listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// `PORTAL_*` environment variables could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),
}
