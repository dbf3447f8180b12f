//! Room lifecycle management for Portal.
//!
//! Each open room runs as an isolated Tokio task (actor model) that owns the
//! room's document snapshot and its member sessions. The registry maps room
//! codes to those tasks and is only consulted when a room is created, when
//! a connection arrives, and when idle rooms are swept.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — allocates codes, looks rooms up, reaps idle ones
//! - [`RoomHub`] — send commands to a running room actor
//! - [`RoomInfo`] — point-in-time view of a room
//! - [`RoomConfig`] — idle grace period and channel sizing

mod config;
mod error;
mod hub;
mod registry;

pub use config::RoomConfig;
pub use error::RoomError;
pub use hub::{MemberReceiver, RoomHub, RoomInfo};
pub use registry::RoomRegistry;
