//! Simulation server.
//!
//! `SimServer` runs the real [`ServerDriver`] and [`Dispatcher`] with
//! in-memory connection handles instead of sockets. Tests drive it one event
//! at a time and read back what each connection received. Inboxes outlive
//! their connections so tests can inspect them after a disconnect.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use wordpulse_core::SessionId;
use wordpulse_proto::{ClientCommand, ServerMessage};
use wordpulse_server::{
    ConnectionHandle, DeliveryError, DeliveryReport, Dispatcher, DriverConfig, ServerDriver,
    ServerEvent,
};

use crate::SimEnv;

/// How a simulated connection reacts to deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleMode {
    /// Accept every event.
    #[default]
    Open,
    /// Reject events as if the outbound queue were full.
    Full,
    /// Reject events as if the transport had closed.
    Closed,
}

#[derive(Debug, Default)]
struct Inbox {
    payloads: Vec<Arc<str>>,
    mode: HandleMode,
}

/// In-memory connection handle recording every delivered payload.
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    inbox: Arc<Mutex<Inbox>>,
}

impl SimHandle {
    fn lock(&self) -> MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change how later deliveries are handled.
    pub fn set_mode(&self, mode: HandleMode) {
        self.lock().mode = mode;
    }

    /// Raw JSON payloads received so far.
    pub fn payloads(&self) -> Vec<String> {
        self.lock().payloads.iter().map(ToString::to_string).collect()
    }

    /// Decoded events received so far.
    pub fn messages(&self) -> Vec<ServerMessage> {
        self.lock().payloads.iter().filter_map(|p| ServerMessage::decode(p).ok()).collect()
    }

    /// Decoded events, clearing the inbox.
    pub fn take_messages(&self) -> Vec<ServerMessage> {
        let payloads = std::mem::take(&mut self.lock().payloads);
        payloads.iter().filter_map(|p| ServerMessage::decode(p).ok()).collect()
    }
}

impl ConnectionHandle for SimHandle {
    fn deliver(&self, session_id: SessionId, payload: Arc<str>) -> Result<(), DeliveryError> {
        let mut inbox = self.lock();
        match inbox.mode {
            HandleMode::Open => {
                inbox.payloads.push(payload);
                Ok(())
            },
            HandleMode::Full => Err(DeliveryError::QueueFull(session_id)),
            HandleMode::Closed => Err(DeliveryError::Closed(session_id)),
        }
    }
}

/// Simulation server for deterministic tests.
///
/// This server is designed for test-driven usage where tests explicitly
/// drive the server rather than having it run autonomously.
pub struct SimServer {
    /// The action-based server driver
    driver: ServerDriver<SimEnv>,
    /// Live handles
    dispatcher: Dispatcher<SimHandle>,
    /// Every handle ever created (`session_id` → handle)
    handles: HashMap<SessionId, SimHandle>,
    /// Next connection ID
    next_session_id: SessionId,
    env: SimEnv,
}

impl SimServer {
    /// Create a simulation server with default config and seed 0.
    pub fn new() -> Self {
        Self::with_config(DriverConfig::default(), SimEnv::new())
    }

    /// Create a simulation server with an explicit seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(DriverConfig::default(), SimEnv::with_seed(seed))
    }

    /// Create a simulation server with custom config.
    pub fn with_config(config: DriverConfig, env: SimEnv) -> Self {
        let driver = ServerDriver::new(env.clone(), config);
        Self {
            driver,
            dispatcher: Dispatcher::new(),
            handles: HashMap::new(),
            next_session_id: 1,
            env,
        }
    }

    /// Open a connection and return its session ID.
    ///
    /// If the driver refuses it (connection limit), the session is returned
    /// anyway but [`is_connected`](Self::is_connected) reports false.
    pub fn connect(&mut self) -> io::Result<SessionId> {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let actions = self
            .driver
            .process_event(ServerEvent::ConnectionAccepted { session_id })
            .map_err(|e| io::Error::other(e.to_string()))?;

        let handle = SimHandle::default();
        self.handles.insert(session_id, handle.clone());
        self.dispatcher.register(session_id, handle);
        self.dispatcher.execute(actions);

        if !self.dispatcher.is_registered(session_id) {
            tracing::debug!(session_id, "simulated connection refused");
        }

        Ok(session_id)
    }

    /// Deliver a decoded command from `session_id`.
    pub fn send(
        &mut self,
        session_id: SessionId,
        command: ClientCommand,
    ) -> io::Result<DeliveryReport> {
        let actions = self
            .driver
            .process_event(ServerEvent::CommandReceived { session_id, command })
            .map_err(|e| io::Error::other(e.to_string()))?;

        Ok(self.dispatcher.execute(actions))
    }

    /// Decode raw frame text and deliver it.
    ///
    /// Undecodable text fails with `InvalidData` and touches no state.
    pub fn send_text(&mut self, session_id: SessionId, text: &str) -> io::Result<DeliveryReport> {
        let command = ClientCommand::decode(text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        self.send(session_id, command)
    }

    /// Close a connection.
    pub fn disconnect(&mut self, session_id: SessionId) -> io::Result<DeliveryReport> {
        self.dispatcher.unregister(session_id);

        let actions = self
            .driver
            .process_event(ServerEvent::ConnectionClosed {
                session_id,
                reason: "client disconnect".to_string(),
            })
            .map_err(|e| io::Error::other(e.to_string()))?;

        Ok(self.dispatcher.execute(actions))
    }

    /// Session is registered with the driver.
    pub fn is_connected(&self, session_id: SessionId) -> bool {
        self.driver.session(session_id).is_some()
    }

    /// Handle for a session, live or closed.
    pub fn handle(&self, session_id: SessionId) -> Option<&SimHandle> {
        self.handles.get(&session_id)
    }

    /// Events a session has received. Empty for unknown sessions.
    pub fn inbox(&self, session_id: SessionId) -> Vec<ServerMessage> {
        self.handle(session_id).map(SimHandle::messages).unwrap_or_default()
    }

    /// Events a session has received, clearing its inbox.
    pub fn take_inbox(&self, session_id: SessionId) -> Vec<ServerMessage> {
        self.handle(session_id).map(SimHandle::take_messages).unwrap_or_default()
    }

    /// Make later deliveries to a session fail.
    pub fn set_mode(&self, session_id: SessionId, mode: HandleMode) {
        if let Some(handle) = self.handle(session_id) {
            handle.set_mode(mode);
        }
    }

    /// Move the virtual clock forward.
    pub fn advance_time(&self, duration: Duration) {
        self.env.advance(duration);
    }

    /// Driver, for state inspection.
    pub fn driver(&self) -> &ServerDriver<SimEnv> {
        &self.driver
    }

    /// Environment shared with the driver.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimServer")
            .field("driver", &self.driver)
            .field("next_session_id", &self.next_session_id)
            .finish_non_exhaustive()
    }
}
