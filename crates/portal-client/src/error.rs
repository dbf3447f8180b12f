//! Error types for the client.

use crate::ClientState;

/// Errors surfaced to whoever drives the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The creation endpoint answered without a usable room identifier.
    #[error("room creation failed: {0}")]
    CreationFailure(String),

    /// The HTTP request itself failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// `connect` was called while already connecting or connected.
    #[error("cannot connect while {0}")]
    InvalidState(ClientState),

    /// `PORTAL_*` environment variables could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// The driver task has already finished.
    #[error("sync driver has stopped")]
    DriverStopped,
}
