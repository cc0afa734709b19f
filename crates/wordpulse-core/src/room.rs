//! Room record.
//!
//! A room is identified by a client-supplied string, labelled once at
//! creation, and holds an ordered member list plus a [`WordLedger`].
//!
//! Members are connection session IDs, not connection handles: the room never
//! owns or closes a transport, it only records who should receive its events.
//! The member list preserves join order and does not de-duplicate, so a
//! connection that joins twice is listed (and notified) twice.

use serde::Serialize;

use crate::ledger::WordLedger;

/// Identifier the runtime assigns to each live connection.
pub type SessionId = u64;

/// A shared session that participants join and contribute words to.
///
/// Generic over `I` (Instant type) to support virtual time in tests.
#[derive(Debug, Clone)]
pub struct Room<I> {
    id: String,
    name: String,
    members: Vec<SessionId>,
    ledger: WordLedger,
    created_at: I,
}

impl<I: Copy> Room<I> {
    /// Create a room whose only member is `creator`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        creator: SessionId,
        created_at: I,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: vec![creator],
            ledger: WordLedger::new(),
            created_at,
        }
    }

    /// Room identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name set at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in join order, duplicates included.
    pub fn members(&self) -> &[SessionId] {
        &self.members
    }

    /// Member count, counting duplicate joins separately.
    pub fn participants(&self) -> usize {
        self.members.len()
    }

    /// True if `session_id` appears in the member list at least once.
    pub fn has_member(&self, session_id: SessionId) -> bool {
        self.members.contains(&session_id)
    }

    /// Append a member. No duplicate check.
    pub fn add_member(&mut self, session_id: SessionId) {
        self.members.push(session_id);
    }

    /// Remove every occurrence of `session_id`, keeping the order of the rest.
    ///
    /// Returns how many entries were removed.
    pub fn remove_member(&mut self, session_id: SessionId) -> usize {
        let before = self.members.len();
        self.members.retain(|&m| m != session_id);
        before - self.members.len()
    }

    /// Word ledger.
    pub fn ledger(&self) -> &WordLedger {
        &self.ledger
    }

    /// Tokenize and append submitted text. Returns tokens appended.
    pub fn append_words(&mut self, text: &str) -> usize {
        self.ledger.append(text)
    }

    /// Stored words in submission order.
    pub fn words(&self) -> &[String] {
        self.ledger.words()
    }

    /// When the room was created.
    pub fn created_at(&self) -> I {
        self.created_at
    }

    /// Read-only view for inspection endpoints and tests.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room: self.id.clone(),
            name: self.name.clone(),
            participants: self.participants(),
            words: self.ledger.snapshot(),
        }
    }
}

/// Point-in-time copy of a room's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSnapshot {
    /// Room identifier
    pub room: String,
    /// Display name
    pub name: String,
    /// Member count
    pub participants: usize,
    /// Full word sequence
    pub words: Vec<String>,
}
