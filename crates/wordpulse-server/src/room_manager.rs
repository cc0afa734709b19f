//! Room Manager
//!
//! Membership and word-ledger operations over the [`RoomRegistry`]. Every
//! operation mutates state first and then describes, as [`RoomAction`]s, which
//! events must reach which sessions. The manager never performs delivery
//! itself.
//!
//! Unknown rooms and duplicate creates come back as [`RoomError`]s. Callers
//! treat them as silent no-ops: no state change and no reply to the sender.

use wordpulse_core::{Room, RoomSnapshot, SessionId, env::Environment};
use wordpulse_proto::ServerMessage;

use crate::registry::{RoomError, RoomRegistry};

/// Actions returned by RoomManager for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    /// Send an event to the requesting session only
    Reply {
        /// Session that issued the command
        session_id: SessionId,
        /// Event to send
        message: ServerMessage,
    },

    /// Send an event to a snapshot of the room's members
    Broadcast {
        /// Room the event describes
        room_id: String,
        /// Members at the time of the mutation, in join order
        recipients: Vec<SessionId>,
        /// Event to send
        message: ServerMessage,
    },
}

/// Membership manager and word ledger for all rooms.
///
/// Generic over `I` (Instant type) to support virtual time in tests.
pub struct RoomManager<I = std::time::Instant> {
    registry: RoomRegistry<I>,
}

impl<I: Copy> RoomManager<I> {
    /// Create a manager with an empty registry.
    pub fn new() -> Self {
        Self { registry: RoomRegistry::new() }
    }

    /// Check if a room exists
    pub fn has_room(&self, room_id: &str) -> bool {
        self.registry.exists(room_id)
    }

    /// Look up a room.
    pub fn room(&self, room_id: &str) -> Option<&Room<I>> {
        self.registry.get(room_id).ok()
    }

    /// Snapshot of a room's observable state.
    pub fn snapshot(&self, room_id: &str) -> Option<RoomSnapshot> {
        self.room(room_id).map(Room::snapshot)
    }

    /// Number of rooms ever created.
    pub fn room_count(&self) -> usize {
        self.registry.len()
    }

    /// Underlying registry.
    pub fn registry(&self) -> &RoomRegistry<I> {
        &self.registry
    }

    /// Creates a room with `requester` as its first member and confirms it to
    /// the requester only.
    ///
    /// A duplicate ID leaves the existing room untouched and returns
    /// `RoomAlreadyExists`.
    pub fn create_room<E: Environment<Instant = I>>(
        &mut self,
        room_id: &str,
        name: &str,
        requester: SessionId,
        env: &E,
    ) -> Result<Vec<RoomAction>, RoomError> {
        let room = self.registry.create(room_id, name, requester, env.now())?;

        Ok(vec![RoomAction::Reply {
            session_id: requester,
            message: ServerMessage::room_created(room.id(), room.name()),
        }])
    }

    /// Appends `requester` to the room's members and broadcasts the new count
    /// and full word snapshot to every member, the joiner included.
    ///
    /// Joining twice is not prevented; the session is then listed twice.
    pub fn join_room(
        &mut self,
        room_id: &str,
        requester: SessionId,
    ) -> Result<Vec<RoomAction>, RoomError> {
        let room = self.registry.get_mut(room_id)?;
        room.add_member(requester);

        let message = ServerMessage::room_joined(
            room.id(),
            room.name(),
            room.participants(),
            room.ledger().snapshot(),
        );

        Ok(vec![RoomAction::Broadcast {
            room_id: room.id().to_string(),
            recipients: room.members().to_vec(),
            message,
        }])
    }

    /// Tokenizes `text`, appends the tokens to the room's ledger and
    /// broadcasts the full word snapshot to every member.
    ///
    /// The submitter does not have to be a member.
    pub fn add_words(&mut self, room_id: &str, text: &str) -> Result<Vec<RoomAction>, RoomError> {
        let room = self.registry.get_mut(room_id)?;
        room.append_words(text);

        Ok(vec![RoomAction::Broadcast {
            room_id: room.id().to_string(),
            recipients: room.members().to_vec(),
            message: ServerMessage::words_added(room.id(), room.ledger().snapshot()),
        }])
    }

    /// Removes `session_id` from every room it belongs to.
    ///
    /// Every occurrence is removed. Each room whose member count changed gets
    /// one `room-joined` event, without `words`, sent to its remaining
    /// members. Rooms left empty stay registered.
    pub fn remove_participant(&mut self, session_id: SessionId) -> Vec<RoomAction> {
        let mut actions = Vec::new();

        self.registry.for_each_mut(|room| {
            if room.remove_member(session_id) == 0 || room.participants() == 0 {
                return;
            }

            actions.push(RoomAction::Broadcast {
                room_id: room.id().to_string(),
                recipients: room.members().to_vec(),
                message: ServerMessage::participants_changed(
                    room.id(),
                    room.name(),
                    room.participants(),
                ),
            });
        });

        actions
    }
}

impl<I: Copy> Default for RoomManager<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Copy> std::fmt::Debug for RoomManager<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomManager").field("room_count", &self.registry.len()).finish()
    }
}
