//! # Portal
//!
//! Shared-text rooms over WebSockets.
//!
//! Anyone can create a room and gets a six-digit code back. Everyone who
//! connects with that code edits the same piece of text: each edit replaces
//! the whole document (last write wins) and is broadcast to every other
//! participant. Rooms nobody has used for a while are swept away.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portal::prelude::*;
//!
//! # async fn demo() -> Result<(), PortalError> {
//! let server = PortalServer::builder()
//!     .bind("0.0.0.0:5000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::PortalError;
pub use server::{PortalServer, PortalServerBuilder};

/// Re-exports everything needed to run a server or a client.
pub mod prelude {
    pub use crate::{PortalError, PortalServer, PortalServerBuilder, ServerConfig};

    pub use portal_client::{
        ClientConfig, ClientError, ClientEvent, ClientState, SyncClient,
        SyncDriver, create_room, room_exists,
    };
    pub use portal_protocol::{Codec, Frame, JsonCodec, ProtocolError, RoomCode, SessionId};
    pub use portal_room::{RoomConfig, RoomError, RoomHub, RoomInfo, RoomRegistry};
    pub use portal_session::{ClientSession, SessionError, SessionState};
    pub use portal_transport::{Connection, ConnectionId, TransportError};
}
