//! Wire protocol for Portal.
//!
//! This crate defines the "language" that editors and the server speak:
//!
//! - **Types** ([`Frame`], [`RoomCode`], [`SessionId`], the HTTP payloads) —
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those structures are
//!   converted to/from text.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while parsing.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer. It doesn't know about connections or hubs, only about how a
//! document update or a room code looks on the wire.
//!
//! ```text
//! Transport (bytes) → Protocol (Frame) → Session → Room hub
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    CreateRoomResponse, Frame, RoomCode, RoomExistsResponse, SessionId,
};
