//! Driver and delivery error types.
//!
//! Provides strongly-typed errors for server operations:
//! - Session management (registration, lookup)
//! - Per-recipient delivery (queue full, connection gone)
//!
//! Room-level failures (unknown room, duplicate create) are not errors at this
//! layer. The driver turns them into log actions and carries on.

use std::fmt;

use wordpulse_core::SessionId;

/// Errors that can occur while the driver processes an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Session not found in the driver.
    ///
    /// A command or close arrived for a session that was never accepted (or
    /// was rejected at accept time). The runtime logs it and continues.
    SessionNotFound(SessionId),

    /// Session already registered.
    ///
    /// Attempting to accept a session ID that is still live. Session IDs are
    /// random 64-bit values, so this indicates an ID collision or a runtime
    /// bug. The new connection is refused.
    SessionAlreadyExists(SessionId),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionAlreadyExists(id) => write!(f, "session already exists: {id}"),
        }
    }
}

impl std::error::Error for ServerError {}

/// Failure to hand one event to one recipient.
///
/// Delivery is fire-and-forget: these are collected per recipient, logged,
/// and never abort delivery to the other members of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No live connection handle for the session.
    UnknownSession(SessionId),

    /// The connection's outbound queue is full (slow consumer). The event is
    /// dropped for this recipient.
    QueueFull(SessionId),

    /// The connection is closing and no longer accepts events.
    Closed(SessionId),

    /// The event could not be serialized.
    Encode(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSession(id) => write!(f, "no connection for session {id}"),
            Self::QueueFull(id) => write!(f, "outbound queue full for session {id}"),
            Self::Closed(id) => write!(f, "connection closed for session {id}"),
            Self::Encode(msg) => write!(f, "failed to encode event: {msg}"),
        }
    }
}

impl std::error::Error for DeliveryError {}
