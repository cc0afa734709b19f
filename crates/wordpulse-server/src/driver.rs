//! Server driver.
//!
//! Ties together the session table and the RoomManager. The driver is the
//! routing half of the connection gateway: it receives already-decoded
//! commands, dispatches them by type, and returns the actions the runtime
//! must execute. It performs no I/O, so one call to
//! [`process_event`](ServerDriver::process_event) is one atomic turn: every
//! mutation and the list of resulting deliveries are complete before the next
//! event is looked at.

use std::{collections::HashMap, time::Duration};

use wordpulse_core::{RoomSnapshot, SessionId, env::Environment};
use wordpulse_proto::{ClientCommand, ServerMessage};

use crate::{
    registry::RoomError,
    room_manager::{RoomAction, RoomManager},
    server_error::ServerError,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        session_id: SessionId,
    },

    /// A decoded command was received from a connection
    CommandReceived {
        /// Connection that sent the command
        session_id: SessionId,
        /// The validated command
        command: ClientCommand,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: SessionId,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction<I = std::time::Instant> {
    /// Send an event to a specific session
    SendToSession {
        /// Target session ID
        session_id: SessionId,
        /// Event to send
        message: ServerMessage,
    },

    /// Send an event to a room's members
    BroadcastToRoom {
        /// Room the event describes
        room_id: String,
        /// Members to deliver to, resolved when the room was mutated
        recipients: Vec<SessionId>,
        /// Event to send
        message: ServerMessage,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: SessionId,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// When the event occurred
        timestamp: I,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Per-connection bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo<I> {
    /// When the connection was accepted
    pub connected_at: I,
    /// When the connection last sent a command
    pub last_activity: I,
    /// Commands received over this connection
    pub commands: u64,
}

/// Action-based server driver.
///
/// Orchestrates connection bookkeeping and room operations.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Live sessions (session_id → info)
    sessions: HashMap<SessionId, SessionInfo<E::Instant>>,
    /// Room manager (membership + word ledger)
    room_manager: RoomManager<E::Instant>,
    /// Environment (time, RNG)
    env: E,
    /// Server configuration
    config: ServerConfig,
}

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self { sessions: HashMap::new(), room_manager: RoomManager::new(), env, config }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(
        &mut self,
        event: ServerEvent,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::CommandReceived { session_id, command } => {
                self.handle_command(session_id, command)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                self.handle_connection_closed(session_id, &reason)
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        session_id: SessionId,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        if self.sessions.contains_key(&session_id) {
            return Err(ServerError::SessionAlreadyExists(session_id));
        }

        if self.sessions.len() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        self.sessions
            .insert(session_id, SessionInfo { connected_at: now, last_activity: now, commands: 0 });

        Ok(vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("connection accepted, session_id={session_id}"),
            timestamp: now,
        }])
    }

    /// Route a decoded command to the room manager.
    fn handle_command(
        &mut self,
        session_id: SessionId,
        command: ClientCommand,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        let info = self.sessions.get_mut(&session_id).ok_or(ServerError::SessionNotFound(session_id))?;
        info.last_activity = now;
        info.commands += 1;

        let kind = command.kind();
        let result = match command {
            ClientCommand::CreateRoom { room, name } => {
                self.room_manager.create_room(&room, &name, session_id, &self.env)
            },
            ClientCommand::JoinRoom { room } => self.room_manager.join_room(&room, session_id),
            ClientCommand::AddWord { room, words } => self.room_manager.add_words(&room, &words),
        };

        match result {
            Ok(room_actions) => {
                let mut actions = Vec::with_capacity(room_actions.len() + 1);
                actions.push(ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("session {session_id} {kind}"),
                    timestamp: now,
                });
                actions.extend(room_actions.into_iter().map(Self::convert_room_action));
                Ok(actions)
            },
            // Unknown rooms and duplicate creates are dropped without a reply
            Err(err) => Ok(vec![self.ignored(session_id, &err)]),
        }
    }

    /// Handle a connection closing: remove it from every room.
    fn handle_connection_closed(
        &mut self,
        session_id: SessionId,
        reason: &str,
    ) -> Result<Vec<ServerAction<E::Instant>>, ServerError> {
        let now = self.env.now();

        let Some(info) = self.sessions.remove(&session_id) else {
            return Err(ServerError::SessionNotFound(session_id));
        };

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!(
                "session {session_id} closed after {:?} (commands={}): {reason}",
                now - info.connected_at,
                info.commands
            ),
            timestamp: now,
        }];
        actions.extend(
            self.room_manager.remove_participant(session_id).into_iter().map(Self::convert_room_action),
        );

        Ok(actions)
    }

    fn ignored(&self, session_id: SessionId, err: &RoomError) -> ServerAction<E::Instant> {
        ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("ignoring command from session {session_id}: {err}"),
            timestamp: self.env.now(),
        }
    }

    fn convert_room_action(action: RoomAction) -> ServerAction<E::Instant> {
        match action {
            RoomAction::Reply { session_id, message } => {
                ServerAction::SendToSession { session_id, message }
            },
            RoomAction::Broadcast { room_id, recipients, message } => {
                ServerAction::BroadcastToRoom { room_id, recipients, message }
            },
        }
    }

    /// Snapshot of a room. `None` if the room doesn't exist.
    pub fn room_snapshot(&self, room_id: &str) -> Option<RoomSnapshot> {
        self.room_manager.snapshot(room_id)
    }

    /// Time since the room was created. `None` if the room doesn't exist.
    pub fn room_age(&self, room_id: &str) -> Option<Duration> {
        self.room_manager.room(room_id).map(|room| self.env.now() - room.created_at())
    }

    /// Members of a room in join order. Empty if the room doesn't exist.
    pub fn room_members(&self, room_id: &str) -> &[SessionId] {
        self.room_manager.room(room_id).map_or(&[], |room| room.members())
    }

    /// Room exists.
    pub fn has_room(&self, room_id: &str) -> bool {
        self.room_manager.has_room(room_id)
    }

    /// Number of rooms ever created.
    pub fn room_count(&self) -> usize {
        self.room_manager.room_count()
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Bookkeeping for a live session. `None` if not connected.
    pub fn session(&self, session_id: SessionId) -> Option<&SessionInfo<E::Instant>> {
        self.sessions.get(&session_id)
    }

    /// Room manager, for read-only inspection.
    pub fn room_manager(&self) -> &RoomManager<E::Instant> {
        &self.room_manager
    }
}

impl<E> std::fmt::Debug for ServerDriver<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.sessions.len())
            .field("room_count", &self.room_manager.room_count())
            .finish()
    }
}
