//! Operations for model-based testing.
//!
//! Operations represent everything a participant can do. They are generated
//! randomly by proptest (or libFuzzer) and applied to both the model and the
//! real implementation.

use arbitrary::Arbitrary;

/// Client identifier (0-indexed).
pub type ClientId = u8;

/// Room identifier (uses u8 to keep test space manageable).
pub type ModelRoomId = u8;

/// Number of distinct room IDs operations map onto.
pub const ROOM_SPACE: u8 = 4;

/// Wire room ID for a model room.
pub fn room_key(room_id: ModelRoomId) -> String {
    format!("room-{}", room_id % ROOM_SPACE)
}

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Client opens a connection (a fresh session if it had closed one).
    Connect {
        /// Client connecting.
        client_id: ClientId,
    },

    /// Client creates a room.
    CreateRoom {
        /// Client performing the operation.
        client_id: ClientId,
        /// Room to create.
        room_id: ModelRoomId,
        /// Seed for the display name.
        name: u8,
    },

    /// Client joins a room.
    JoinRoom {
        /// Client joining.
        client_id: ClientId,
        /// Room to join.
        room_id: ModelRoomId,
    },

    /// Client submits words.
    AddWords {
        /// Client submitting.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
        /// Submitted text.
        words: SmallWords,
    },

    /// Client's connection closes.
    Disconnect {
        /// Client disconnecting.
        client_id: ClientId,
    },
}

impl Operation {
    /// Client this operation acts for.
    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Connect { client_id }
            | Self::CreateRoom { client_id, .. }
            | Self::JoinRoom { client_id, .. }
            | Self::AddWords { client_id, .. }
            | Self::Disconnect { client_id } => *client_id,
        }
    }
}

const VOCABULARY: [&str; 6] = ["cat", "dog", "owl", "fox", "elk", "émeu"];

/// Compact submitted text.
///
/// Expands to a few words from a small vocabulary so repeats are common, with
/// a separator that sometimes produces empty tokens.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallWords {
    /// Word selection seed.
    pub seed: u8,
    /// Word count hint (0-3).
    pub count: u8,
    /// Separator selector.
    pub separator: u8,
}

impl SmallWords {
    /// Expand to submitted text.
    pub fn to_text(&self) -> String {
        let separator = match self.separator % 4 {
            0 | 1 => " ",
            2 => "  ",
            _ => "\t",
        };

        (0..=(self.count % 4) as usize)
            .map(|i| VOCABULARY[(self.seed as usize + i * 5) % VOCABULARY.len()])
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Room already exists.
    RoomAlreadyExists,

    /// Room not found.
    RoomNotFound,

    /// Client has no open connection.
    Disconnected,

    /// Client already has an open connection.
    AlreadyConnected,
}
