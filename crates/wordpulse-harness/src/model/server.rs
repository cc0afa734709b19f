//! Model server state machine.
//!
//! A deliberately naive rendition of room behavior: plain vectors, no
//! registry, no dispatcher. Events are appended straight to per-client
//! inboxes in the order the real server is expected to deliver them.

use std::collections::BTreeMap;

use wordpulse_proto::ServerMessage;

use super::operation::{ClientId, OperationError};

/// Per-room state in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoom {
    /// Display name
    pub name: String,
    /// Members in join order, duplicates kept
    pub members: Vec<ClientId>,
    /// Submitted tokens in order
    pub words: Vec<String>,
}

/// Model server state.
#[derive(Debug, Clone, Default)]
pub struct ModelServer {
    rooms: BTreeMap<String, ModelRoom>,
    connected: BTreeMap<ClientId, bool>,
    inboxes: BTreeMap<ClientId, Vec<ServerMessage>>,
}

impl ModelServer {
    /// Create a new model server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client currently has an open connection.
    pub fn is_connected(&self, client_id: ClientId) -> bool {
        self.connected.get(&client_id).copied().unwrap_or(false)
    }

    /// Room state, if the room exists.
    pub fn room(&self, room: &str) -> Option<&ModelRoom> {
        self.rooms.get(room)
    }

    /// All rooms in identifier order.
    pub fn rooms(&self) -> impl Iterator<Item = (&str, &ModelRoom)> {
        self.rooms.iter().map(|(id, room)| (id.as_str(), room))
    }

    /// Everything a client has received, across all of its connections.
    pub fn inbox(&self, client_id: ClientId) -> &[ServerMessage] {
        self.inboxes.get(&client_id).map_or(&[], Vec::as_slice)
    }

    /// Open a connection for `client_id`.
    pub fn connect(&mut self, client_id: ClientId) -> Result<(), OperationError> {
        if self.is_connected(client_id) {
            return Err(OperationError::AlreadyConnected);
        }
        self.connected.insert(client_id, true);
        Ok(())
    }

    /// Create a room. First creator wins.
    pub fn create_room(
        &mut self,
        client_id: ClientId,
        room: &str,
        name: &str,
    ) -> Result<(), OperationError> {
        self.require_connected(client_id)?;
        if self.rooms.contains_key(room) {
            return Err(OperationError::RoomAlreadyExists);
        }

        self.rooms.insert(room.to_string(), ModelRoom {
            name: name.to_string(),
            members: vec![client_id],
            words: Vec::new(),
        });
        self.push(client_id, ServerMessage::room_created(room, name));
        Ok(())
    }

    /// Join a room and tell every member, the joiner included.
    pub fn join_room(&mut self, client_id: ClientId, room: &str) -> Result<(), OperationError> {
        self.require_connected(client_id)?;
        let state = self.rooms.get_mut(room).ok_or(OperationError::RoomNotFound)?;
        state.members.push(client_id);

        let message =
            ServerMessage::room_joined(room, &state.name, state.members.len(), state.words.clone());
        let members = state.members.clone();
        self.push_all(&members, &message);
        Ok(())
    }

    /// Append words and send the full list to every member.
    pub fn add_words(
        &mut self,
        client_id: ClientId,
        room: &str,
        text: &str,
    ) -> Result<(), OperationError> {
        self.require_connected(client_id)?;
        let state = self.rooms.get_mut(room).ok_or(OperationError::RoomNotFound)?;
        state.words.extend(split_words(text));

        let message = ServerMessage::words_added(room, state.words.clone());
        let members = state.members.clone();
        self.push_all(&members, &message);
        Ok(())
    }

    /// Close the client's connection and leave every room.
    pub fn disconnect(&mut self, client_id: ClientId) -> Result<(), OperationError> {
        self.require_connected(client_id)?;
        self.connected.insert(client_id, false);

        let mut notices = Vec::new();
        for (id, state) in &mut self.rooms {
            let before = state.members.len();
            state.members.retain(|&m| m != client_id);
            if state.members.len() != before && !state.members.is_empty() {
                notices.push((
                    state.members.clone(),
                    ServerMessage::participants_changed(id, &state.name, state.members.len()),
                ));
            }
        }

        for (members, message) in notices {
            self.push_all(&members, &message);
        }
        Ok(())
    }

    fn require_connected(&self, client_id: ClientId) -> Result<(), OperationError> {
        if self.is_connected(client_id) { Ok(()) } else { Err(OperationError::Disconnected) }
    }

    fn push(&mut self, client_id: ClientId, message: ServerMessage) {
        self.inboxes.entry(client_id).or_default().push(message);
    }

    fn push_all(&mut self, members: &[ClientId], message: &ServerMessage) {
        for &member in members {
            self.push(member, message.clone());
        }
    }
}

/// Character-by-character split on the ASCII space that keeps empty tokens.
fn split_words(text: &str) -> Vec<String> {
    let mut words = vec![String::new()];
    for ch in text.chars() {
        if ch == ' ' {
            words.push(String::new());
        } else if let Some(last) = words.last_mut() {
            last.push(ch);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_empty_tokens() {
        assert_eq!(split_words("a  b"), vec!["a", "", "b"]);
        assert_eq!(split_words(""), vec![""]);
        assert_eq!(split_words("a\tb c"), vec!["a\tb", "c"]);
    }

    #[test]
    fn disconnect_skips_rooms_left_empty() {
        let mut model = ModelServer::new();
        model.connect(0).unwrap();
        model.create_room(0, "r", "n").unwrap();

        model.disconnect(0).unwrap();

        assert_eq!(model.room("r").unwrap().members, Vec::<ClientId>::new());
        assert_eq!(model.inbox(0).len(), 1);
    }

    #[test]
    fn operations_need_a_connection() {
        let mut model = ModelServer::new();
        assert_eq!(model.create_room(3, "r", "n"), Err(OperationError::Disconnected));
    }
}
