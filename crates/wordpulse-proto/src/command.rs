//! Inbound client commands.
//!
//! Decoding is two-staged: the `type` discriminator is read first so that an
//! unrecognised command can be told apart from a recognised one with bad
//! fields, then the full object is deserialized into the matching variant.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Command types a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `create-room`
    CreateRoom,
    /// `join-room`
    JoinRoom,
    /// `add-word`
    AddWord,
}

impl CommandKind {
    /// Wire name of this command type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateRoom => "create-room",
            Self::JoinRoom => "join-room",
            Self::AddWord => "add-word",
        }
    }
}

impl FromStr for CommandKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create-room" => Ok(Self::CreateRoom),
            "join-room" => Ok(Self::JoinRoom),
            "add-word" => Ok(Self::AddWord),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated command received from a participant.
///
/// Each variant carries only the fields its command requires. Extra fields in
/// the JSON object are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    /// Create a new room with the requester as its first member.
    CreateRoom {
        /// Client-chosen room identifier
        room: String,
        /// Human-readable room label
        name: String,
    },

    /// Join an existing room.
    JoinRoom {
        /// Room to join
        room: String,
    },

    /// Submit space-separated words to a room.
    AddWord {
        /// Target room
        room: String,
        /// Raw submitted text, tokenized by the server
        words: String,
    },
}

/// Discriminator-only view used for the first decoding stage.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<Value>,
}

impl ClientCommand {
    /// Parse and validate a raw text message.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ProtocolError::Malformed("expected a JSON object".to_string()));
        }

        let envelope = Envelope::deserialize(&value)
            .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let kind = match envelope.kind {
            Some(Value::String(kind)) => kind.parse::<CommandKind>()?,
            _ => return Err(ProtocolError::MissingType),
        };

        Self::deserialize(value).map_err(|e| ProtocolError::InvalidCommand {
            kind: kind.as_str(),
            reason: e.to_string(),
        })
    }

    /// Serialize to the JSON text form sent by clients.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Command type of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CreateRoom { .. } => CommandKind::CreateRoom,
            Self::JoinRoom { .. } => CommandKind::JoinRoom,
            Self::AddWord { .. } => CommandKind::AddWord,
        }
    }

    /// Room this command targets.
    pub fn room(&self) -> &str {
        match self {
            Self::CreateRoom { room, .. } | Self::JoinRoom { room } | Self::AddWord { room, .. } => {
                room
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_create_room() {
        let cmd = ClientCommand::decode(r#"{"type":"create-room","room":"abcd1","name":"Animals"}"#)
            .unwrap();
        assert_eq!(cmd, ClientCommand::CreateRoom {
            room: "abcd1".to_string(),
            name: "Animals".to_string()
        });
        assert_eq!(cmd.kind(), CommandKind::CreateRoom);
        assert_eq!(cmd.room(), "abcd1");
    }

    #[test]
    fn decode_ignores_extra_fields() {
        let cmd =
            ClientCommand::decode(r#"{"type":"join-room","room":"r","name":"ignored","x":1}"#)
                .unwrap();
        assert_eq!(cmd, ClientCommand::JoinRoom { room: "r".to_string() });
    }

    #[test]
    fn decode_add_word_keeps_raw_text() {
        let cmd =
            ClientCommand::decode(r#"{"type":"add-word","room":"r","words":"cat  dog"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::AddWord {
            room: "r".to_string(),
            words: "cat  dog".to_string()
        });
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = ClientCommand::decode("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn decode_rejects_non_object() {
        for text in ["[]", "42", "\"create-room\"", "null"] {
            let err = ClientCommand::decode(text).unwrap_err();
            assert!(matches!(err, ProtocolError::Malformed(_)), "{text}: {err:?}");
        }
    }

    #[test]
    fn decode_missing_type() {
        let err = ClientCommand::decode(r#"{"room":"r"}"#).unwrap_err();
        assert_eq!(err, ProtocolError::MissingType);

        let err = ClientCommand::decode(r#"{"type":7,"room":"r"}"#).unwrap_err();
        assert_eq!(err, ProtocolError::MissingType);
    }

    #[test]
    fn decode_unknown_type() {
        let err = ClientCommand::decode(r#"{"type":"leave-room","room":"r"}"#).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownType("leave-room".to_string()));
    }

    #[test]
    fn decode_missing_required_field() {
        let err = ClientCommand::decode(r#"{"type":"create-room","room":"r"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand { kind: "create-room", .. }));

        let err = ClientCommand::decode(r#"{"type":"add-word","room":"r"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand { kind: "add-word", .. }));
    }

    #[test]
    fn decode_mistyped_field() {
        let err =
            ClientCommand::decode(r#"{"type":"add-word","room":"r","words":["a"]}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand { kind: "add-word", .. }));
    }

    #[test]
    fn command_kind_names() {
        for kind in [CommandKind::CreateRoom, CommandKind::JoinRoom, CommandKind::AddWord] {
            assert_eq!(kind.as_str().parse::<CommandKind>().unwrap(), kind);
        }
    }
}
