//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding wire messages.
///
/// None of these are fatal to a connection. The gateway drops the offending
/// message, logs the error and keeps reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input is not valid JSON, or not a JSON object.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Message has no `type` discriminator, or it is not a string.
    #[error("message has no type discriminator")]
    MissingType,

    /// Message `type` is not a known command.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// Known command with missing or mistyped fields.
    #[error("invalid {kind} command: {reason}")]
    InvalidCommand {
        /// Command type that failed validation
        kind: &'static str,
        /// Decoder explanation
        reason: String,
    },

    /// Outbound message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// True when the message was well-formed JSON but named a command type
    /// this server does not handle.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownType(_) | Self::MissingType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::UnknownType("leave-room".to_string());
        assert_eq!(err.to_string(), "unknown message type: leave-room");

        let err = ProtocolError::InvalidCommand {
            kind: "join-room",
            reason: "missing field `room`".to_string(),
        };
        assert_eq!(err.to_string(), "invalid join-room command: missing field `room`");
    }

    #[test]
    fn unknown_type_classification() {
        assert!(ProtocolError::MissingType.is_unknown_type());
        assert!(ProtocolError::UnknownType("x".to_string()).is_unknown_type());
        assert!(!ProtocolError::Malformed("eof".to_string()).is_unknown_type());
    }
}
