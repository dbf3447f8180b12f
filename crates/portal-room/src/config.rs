//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration shared by every room a registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How long a room must sit with zero members before it can be reaped.
    /// The clock starts when the room is created and restarts whenever the
    /// last member leaves.
    pub idle_grace: Duration,

    /// Capacity of each room actor's command channel. When full, callers
    /// wait (bounded channel backpressure).
    pub command_buffer: usize,

    /// Capacity of each member's outbound queue. A member whose socket falls
    /// this many frames behind is dropped from the room.
    pub member_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            idle_grace: Duration::from_secs(60 * 60),
            command_buffer: 64,
            member_buffer: 256,
        }
    }
}
