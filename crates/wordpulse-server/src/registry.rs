//! Room registry.
//!
//! Holds every active room keyed by its client-supplied identifier. Inserting
//! a room is the only structural mutation: rooms are never removed, even when
//! their last member leaves, so a room lives until the process exits.
//!
//! Rooms are kept in a `BTreeMap` so that iteration (used by disconnect
//! cleanup) visits them in a stable order and simulation runs stay
//! reproducible.

use std::collections::BTreeMap;

use wordpulse_core::{Room, SessionId};

/// Errors from registry lookups and inserts.
///
/// Both are expected during normal operation and are never surfaced to the
/// participant that caused them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Room does not exist
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// Room already exists
    #[error("room already exists: {0}")]
    RoomAlreadyExists(String),
}

/// Registry of all rooms in this process.
///
/// Generic over `I` (Instant type) to support virtual time in tests.
#[derive(Debug)]
pub struct RoomRegistry<I> {
    rooms: BTreeMap<String, Room<I>>,
}

impl<I: Copy> RoomRegistry<I> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { rooms: BTreeMap::new() }
    }

    /// Check if a room exists.
    pub fn exists(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Insert a new room with `creator` as its only member.
    ///
    /// The first creator wins: if the ID is taken, the existing room is left
    /// untouched and `RoomAlreadyExists` is returned.
    pub fn create(
        &mut self,
        room_id: &str,
        name: &str,
        creator: SessionId,
        created_at: I,
    ) -> Result<&Room<I>, RoomError> {
        if self.exists(room_id) {
            return Err(RoomError::RoomAlreadyExists(room_id.to_string()));
        }

        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(room_id, name, creator, created_at));
        Ok(room)
    }

    /// Look up a room.
    pub fn get(&self, room_id: &str) -> Result<&Room<I>, RoomError> {
        self.rooms.get(room_id).ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }

    /// Look up a room for mutation.
    pub fn get_mut(&mut self, room_id: &str) -> Result<&mut Room<I>, RoomError> {
        self.rooms.get_mut(room_id).ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }

    /// Visit every room mutably, in identifier order.
    ///
    /// Only disconnect cleanup needs this; everything else addresses a single
    /// room by ID.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Room<I>)) {
        for room in self.rooms.values_mut() {
            f(room);
        }
    }

    /// All rooms in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Room<I>> + '_ {
        self.rooms.values()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// True if no room was ever created.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl<I: Copy> Default for RoomRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}
