//! Outbound server events.
//!
//! `room-joined` is sent in two shapes: with a `words` snapshot when a
//! participant joins, and without one when a disconnect changes the member
//! count. Clients must treat `words` as optional on that event.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Event types the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `room-created`
    RoomCreated,
    /// `room-joined`
    RoomJoined,
    /// `words-added`
    WordsAdded,
}

impl EventKind {
    /// Wire name of this event type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoomCreated => "room-created",
            Self::RoomJoined => "room-joined",
            Self::WordsAdded => "words-added",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room-state event delivered to participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Confirmation sent to the creator only.
    RoomCreated {
        /// Room identifier
        room: String,
        /// Room display name
        name: String,
        /// Member count, always 1 at creation
        participants: usize,
    },

    /// Membership changed. Carries `words` only when caused by a join.
    RoomJoined {
        /// Room identifier
        room: String,
        /// Room display name
        name: String,
        /// Member count after the change
        participants: usize,
        /// Full word snapshot, present on join only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        words: Option<Vec<String>>,
    },

    /// Words were appended. Always the full snapshot, never a delta.
    WordsAdded {
        /// Room identifier
        room: String,
        /// Full word snapshot
        words: Vec<String>,
    },
}

impl ServerMessage {
    /// `room-created` confirmation for a freshly created room.
    pub fn room_created(room: impl Into<String>, name: impl Into<String>) -> Self {
        Self::RoomCreated { room: room.into(), name: name.into(), participants: 1 }
    }

    /// `room-joined` sent to every member after a join.
    pub fn room_joined(
        room: impl Into<String>,
        name: impl Into<String>,
        participants: usize,
        words: Vec<String>,
    ) -> Self {
        Self::RoomJoined { room: room.into(), name: name.into(), participants, words: Some(words) }
    }

    /// `room-joined` sent to remaining members after a disconnect. Has no
    /// `words` field.
    pub fn participants_changed(
        room: impl Into<String>,
        name: impl Into<String>,
        participants: usize,
    ) -> Self {
        Self::RoomJoined { room: room.into(), name: name.into(), participants, words: None }
    }

    /// `words-added` snapshot.
    pub fn words_added(room: impl Into<String>, words: Vec<String>) -> Self {
        Self::WordsAdded { room: room.into(), words }
    }

    /// Event type of this message.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::RoomCreated { .. } => EventKind::RoomCreated,
            Self::RoomJoined { .. } => EventKind::RoomJoined,
            Self::WordsAdded { .. } => EventKind::WordsAdded,
        }
    }

    /// Room this event describes.
    pub fn room(&self) -> &str {
        match self {
            Self::RoomCreated { room, .. }
            | Self::RoomJoined { room, .. }
            | Self::WordsAdded { room, .. } => room,
        }
    }

    /// Serialize to JSON text.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse JSON text produced by [`encode`](Self::encode).
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}
