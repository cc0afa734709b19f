//! Event loop.
//!
//! One tokio task owns the [`ServerDriver`] and the [`Dispatcher`]. Connection
//! tasks and HTTP handlers talk to it only through [`LoopHandle`], so every
//! room mutation and the fan-out it triggers finish before the next message
//! is taken off the channel. Nothing in the loop awaits besides the channel
//! itself: delivery uses non-blocking queue pushes.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use wordpulse_core::{RoomSnapshot, SessionId, env::Environment};
use wordpulse_proto::ClientCommand;

use crate::{
    dispatcher::Dispatcher,
    driver::{ServerDriver, ServerEvent},
    error::ServerError,
    server_error::ServerError as DriverError,
};

/// Capacity of the shared inbound channel.
const LOOP_QUEUE: usize = 1024;

/// Outbound queue of one connection.
pub type Outbound = mpsc::Sender<Arc<str>>;

/// A room as seen by the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    /// Current state
    pub snapshot: RoomSnapshot,
    /// Time since creation
    pub age: Duration,
}

/// Counters reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    /// Rooms ever created
    pub rooms: usize,
    /// Live connections
    pub connections: usize,
}

enum LoopMessage {
    Connect {
        session_id: SessionId,
        outbound: Outbound,
        reply: oneshot::Sender<Result<(), DriverError>>,
    },
    Command { session_id: SessionId, command: ClientCommand },
    Disconnect { session_id: SessionId, reason: String },
    Inspect { room: String, reply: oneshot::Sender<Option<RoomView>> },
    Stats { reply: oneshot::Sender<LoopStats> },
}

/// Cloneable sender side of the event loop.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: mpsc::Sender<LoopMessage>,
}

impl LoopHandle {
    /// Register a new connection and its outbound queue.
    ///
    /// Returns [`ServerError::Refused`] if the driver rejects the session ID.
    /// A refused session was never registered, so the caller must not report
    /// a disconnect for it: that ID belongs to another live connection.
    pub async fn connect(&self, session_id: SessionId, outbound: Outbound) -> Result<(), ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoopMessage::Connect { session_id, outbound, reply }).await?;
        rx.await.map_err(|_| ServerError::LoopStopped)?.map_err(ServerError::Refused)
    }

    /// Forward a decoded command.
    pub async fn command(&self, session_id: SessionId, command: ClientCommand) -> Result<(), ServerError> {
        self.send(LoopMessage::Command { session_id, command }).await
    }

    /// Report that a connection ended. Must follow the connection's last
    /// command.
    pub async fn disconnect(
        &self,
        session_id: SessionId,
        reason: impl Into<String>,
    ) -> Result<(), ServerError> {
        self.send(LoopMessage::Disconnect { session_id, reason: reason.into() }).await
    }

    /// Snapshot and age of one room, `None` if it doesn't exist.
    pub async fn inspect(&self, room: impl Into<String>) -> Result<Option<RoomView>, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoopMessage::Inspect { room: room.into(), reply }).await?;
        rx.await.map_err(|_| ServerError::LoopStopped)
    }

    /// Current room and connection counts.
    pub async fn stats(&self) -> Result<LoopStats, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoopMessage::Stats { reply }).await?;
        rx.await.map_err(|_| ServerError::LoopStopped)
    }

    async fn send(&self, message: LoopMessage) -> Result<(), ServerError> {
        self.tx.send(message).await.map_err(|_| ServerError::LoopStopped)
    }
}

/// Receiving side, consumed by [`EventLoop::run`].
pub struct EventLoop<E: Environment> {
    driver: ServerDriver<E>,
    dispatcher: Dispatcher<Outbound>,
    rx: mpsc::Receiver<LoopMessage>,
}

impl<E: Environment> EventLoop<E> {
    /// Create a loop around `driver` and the handle that feeds it.
    pub fn new(driver: ServerDriver<E>) -> (Self, LoopHandle) {
        let (tx, rx) = mpsc::channel(LOOP_QUEUE);
        (Self { driver, dispatcher: Dispatcher::new(), rx }, LoopHandle { tx })
    }

    /// Process messages until every [`LoopHandle`] is dropped.
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            self.handle(message);
        }
        tracing::debug!("event loop finished");
    }

    fn handle(&mut self, message: LoopMessage) {
        match message {
            LoopMessage::Connect { session_id, outbound, reply } => {
                let event = ServerEvent::ConnectionAccepted { session_id };
                let outcome = match self.driver.process_event(event) {
                    Ok(actions) => {
                        self.dispatcher.register(session_id, outbound);
                        self.dispatcher.execute(actions);
                        Ok(())
                    },
                    // Outbound dropped here; the live handle under this ID is untouched
                    Err(e) => {
                        tracing::warn!(session_id, "connection refused: {}", e);
                        Err(e)
                    },
                };
                let _ = reply.send(outcome);
            },

            LoopMessage::Command { session_id, command } => {
                let event = ServerEvent::CommandReceived { session_id, command };
                self.drive(session_id, event);
            },

            LoopMessage::Disconnect { session_id, reason } => {
                self.dispatcher.unregister(session_id);
                let event = ServerEvent::ConnectionClosed { session_id, reason };
                self.drive(session_id, event);
            },

            LoopMessage::Inspect { room, reply } => {
                let view = self.driver.room_snapshot(&room).zip(self.driver.room_age(&room));
                let _ = reply.send(view.map(|(snapshot, age)| RoomView { snapshot, age }));
            },

            LoopMessage::Stats { reply } => {
                let _ = reply.send(LoopStats {
                    rooms: self.driver.room_count(),
                    connections: self.driver.connection_count(),
                });
            },
        }
    }

    fn drive(&mut self, session_id: SessionId, event: ServerEvent) {
        match self.driver.process_event(event) {
            Ok(actions) => {
                self.dispatcher.execute(actions);
            },
            // Connections closed at the limit still report their close
            Err(DriverError::SessionNotFound(_)) => {
                tracing::debug!(session_id, "event for unregistered session ignored");
            },
            Err(e) => tracing::warn!(session_id, "event processing error: {}", e),
        }
    }
}

impl<E: Environment> std::fmt::Debug for EventLoop<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("driver", &self.driver)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use wordpulse_proto::ServerMessage;

    use super::*;
    use crate::{DriverConfig, SystemEnv};

    fn spawn_loop(max_connections: usize) -> LoopHandle {
        let driver = ServerDriver::new(SystemEnv::new(), DriverConfig { max_connections });
        let (event_loop, handle) = EventLoop::new(driver);
        tokio::spawn(event_loop.run());
        handle
    }

    fn decode(payload: &Arc<str>) -> ServerMessage {
        ServerMessage::decode(payload).unwrap()
    }

    #[tokio::test]
    async fn create_join_and_add_words() {
        let handle = spawn_loop(16);
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        handle.connect(1, tx1).await.unwrap();
        handle.connect(2, tx2).await.unwrap();

        let create = ClientCommand::CreateRoom { room: "abcd1".into(), name: "Animals".into() };
        handle.command(1, create).await.unwrap();
        handle.command(2, ClientCommand::JoinRoom { room: "abcd1".into() }).await.unwrap();
        let add = ClientCommand::AddWord { room: "abcd1".into(), words: "cat dog".into() };
        handle.command(2, add).await.unwrap();

        assert_eq!(decode(&rx1.recv().await.unwrap()), ServerMessage::room_created("abcd1", "Animals"));
        let joined = ServerMessage::room_joined("abcd1", "Animals", 2, vec![]);
        assert_eq!(decode(&rx1.recv().await.unwrap()), joined);
        assert_eq!(decode(&rx2.recv().await.unwrap()), joined);

        let added = ServerMessage::words_added("abcd1", vec!["cat".into(), "dog".into()]);
        assert_eq!(decode(&rx1.recv().await.unwrap()), added);
        assert_eq!(decode(&rx2.recv().await.unwrap()), added);

        let view = handle.inspect("abcd1").await.unwrap().unwrap();
        assert_eq!(view.snapshot.participants, 2);
        assert_eq!(view.snapshot.words, vec!["cat", "dog"]);
        assert_eq!(handle.stats().await.unwrap(), LoopStats { rooms: 1, connections: 2 });
    }

    #[tokio::test]
    async fn over_limit_connection_is_closed() {
        let handle = spawn_loop(1);
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel::<Arc<str>>(8);

        handle.connect(1, tx1).await.unwrap();
        handle.connect(2, tx2).await.unwrap();

        // Outbound queue closed without any event
        assert!(rx2.recv().await.is_none());
        handle.disconnect(2, "closed").await.unwrap();
        assert_eq!(handle.stats().await.unwrap().connections, 1);
    }

    #[tokio::test]
    async fn colliding_session_id_is_refused_without_touching_live_session() {
        let handle = spawn_loop(16);
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel::<Arc<str>>(8);
        handle.connect(7, tx1).await.unwrap();
        handle
            .command(7, ClientCommand::CreateRoom { room: "r".into(), name: "n".into() })
            .await
            .unwrap();

        let refused = handle.connect(7, tx2).await;

        assert!(matches!(refused, Err(ServerError::Refused(DriverError::SessionAlreadyExists(7)))));
        assert!(rx2.recv().await.is_none());
        assert_eq!(decode(&rx1.recv().await.unwrap()), ServerMessage::room_created("r", "n"));
        assert_eq!(handle.inspect("r").await.unwrap().unwrap().snapshot.participants, 1);
        assert_eq!(handle.stats().await.unwrap().connections, 1);

        // The original connection still receives broadcasts
        let add = ClientCommand::AddWord { room: "r".into(), words: "still here".into() };
        handle.command(7, add).await.unwrap();
        let added = ServerMessage::words_added("r", vec!["still".into(), "here".into()]);
        assert_eq!(decode(&rx1.recv().await.unwrap()), added);
    }

    #[tokio::test]
    async fn disconnect_notifies_remaining_members() {
        let handle = spawn_loop(16);
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);
        handle.connect(1, tx1).await.unwrap();
        handle.connect(2, tx2).await.unwrap();
        handle
            .command(1, ClientCommand::CreateRoom { room: "r".into(), name: "n".into() })
            .await
            .unwrap();
        handle.command(2, ClientCommand::JoinRoom { room: "r".into() }).await.unwrap();

        handle.disconnect(2, "client disconnect").await.unwrap();

        rx1.recv().await.unwrap(); // room-created
        rx1.recv().await.unwrap(); // room-joined
        assert_eq!(decode(&rx1.recv().await.unwrap()), ServerMessage::participants_changed("r", "n", 1));
        assert_eq!(handle.inspect("missing").await.unwrap(), None);
    }
}
