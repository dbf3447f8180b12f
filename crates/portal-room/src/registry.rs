//! Room registry: allocates room codes and tracks every open room.

use std::collections::HashMap;

use portal_protocol::RoomCode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::hub::spawn_hub;
use crate::{RoomConfig, RoomError, RoomHub};

/// Random draws attempted before falling back to a linear scan.
const RANDOM_ATTEMPTS: usize = 32;

/// Owns the mapping from room code to running room hub.
///
/// Not thread-safe by itself: the server wraps it in a mutex and only
/// touches it on create, connect, and sweep. Per-edit traffic goes straight
/// to the [`RoomHub`] a session looked up once.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHub>,
    config: RoomConfig,
    rng: StdRng,
}

impl RoomRegistry {
    /// Creates a new, empty registry seeded from the OS.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Creates a registry with a deterministic code sequence.
    pub fn with_seed(config: RoomConfig, seed: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the configuration applied to every room.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Allocates a fresh code, spawns an empty room for it, and returns the
    /// code.
    ///
    /// Collisions with open rooms are retried, never returned.
    ///
    /// # Errors
    /// [`RoomError::CodeSpaceExhausted`] only when all 1,000,000 codes are
    /// in use.
    pub fn create_room(&mut self) -> Result<RoomCode, RoomError> {
        let rooms = &self.rooms;
        let code = allocate_code(&mut self.rng, |code| rooms.contains_key(&code))
            .ok_or(RoomError::CodeSpaceExhausted)?;

        let hub = spawn_hub(code, &self.config);
        self.rooms.insert(code, hub);
        tracing::info!(room = %code, rooms = self.rooms.len(), "room created");
        Ok(code)
    }

    /// Returns a handle to an open room.
    pub fn lookup(&self, code: RoomCode) -> Result<RoomHub, RoomError> {
        self.rooms
            .get(&code)
            .cloned()
            .ok_or(RoomError::NotFound(code))
    }

    /// Returns `true` if a room with this code is open.
    pub fn contains(&self, code: RoomCode) -> bool {
        self.rooms.contains_key(&code)
    }

    /// Removes the room if it has been empty for at least the configured
    /// grace period. Returns whether it was removed.
    ///
    /// A room whose actor already stopped is removed as well.
    pub async fn reap(&mut self, code: RoomCode) -> Result<bool, RoomError> {
        let hub = self.rooms.get(&code).ok_or(RoomError::NotFound(code))?;

        let reaped = match hub.reap_if_idle(self.config.idle_grace).await {
            Ok(idle) => idle,
            Err(RoomError::Unavailable(_)) => true,
            Err(e) => return Err(e),
        };

        if reaped {
            self.rooms.remove(&code);
            tracing::info!(room = %code, rooms = self.rooms.len(), "room reaped");
        }
        Ok(reaped)
    }

    /// Reaps every room that is past its idle grace period and returns the
    /// codes that were removed.
    pub async fn reap_idle(&mut self) -> Vec<RoomCode> {
        let mut reaped = Vec::new();
        for code in self.room_codes() {
            match self.reap(code).await {
                Ok(true) => reaped.push(code),
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(room = %code, error = %e, "reap failed");
                }
            }
        }
        reaped
    }

    /// Returns the number of open rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all open room codes.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().copied().collect()
    }
}

/// Picks a code for which `is_taken` is false.
///
/// Tries random draws first; when those keep colliding, scans the whole
/// space from a random offset so a free code is always found if one exists.
fn allocate_code<R: Rng>(
    rng: &mut R,
    is_taken: impl Fn(RoomCode) -> bool,
) -> Option<RoomCode> {
    for _ in 0..RANDOM_ATTEMPTS {
        let code = RoomCode::from_index(rng.random_range(0..RoomCode::SPACE))?;
        if !is_taken(code) {
            return Some(code);
        }
    }

    tracing::warn!("room code draws keep colliding, scanning for a free code");
    let start = rng.random_range(0..RoomCode::SPACE);
    (0..RoomCode::SPACE)
        .filter_map(|offset| RoomCode::from_index((start + offset) % RoomCode::SPACE))
        .find(|code| !is_taken(*code))
}
