//! Server-side session handling for Portal.
//!
//! One [`ClientSession`] exists per incoming connection. It decides whether
//! the connection may join a room at all, and once admitted it shuttles
//! frames between the connection and the room's hub.
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP upgrade handler (above)  ← validates before upgrading, runs after
//!     ↕
//! Session layer (this crate)    ← state machine + frame loop
//!     ↕
//! Room hub / Connection (below) ← fan-out and the raw socket
//! ```

mod error;
mod session;

pub use error::SessionError;
pub use session::{ClientSession, SessionState};
