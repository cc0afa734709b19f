//! Broadcast dispatcher.
//!
//! Owns the mapping from session ID to live connection handle and executes the
//! delivery half of [`ServerAction`]s. Delivery is fire-and-forget: every
//! event is serialized once, handed to each recipient's outbound queue without
//! waiting, and a failure for one recipient (full queue, closed connection) is
//! recorded and skipped so the rest of the broadcast still goes out.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::mpsc;
use wordpulse_core::SessionId;
use wordpulse_proto::ServerMessage;

use crate::{
    driver::{LogLevel, ServerAction},
    server_error::DeliveryError,
};

/// Send capability for one connection.
///
/// Implementations must not block: the dispatcher runs on the event loop and
/// a slow consumer must never hold up other recipients.
pub trait ConnectionHandle: Send {
    /// Queue one serialized event for the connection.
    fn deliver(&self, session_id: SessionId, payload: Arc<str>) -> Result<(), DeliveryError>;
}

impl ConnectionHandle for mpsc::Sender<Arc<str>> {
    fn deliver(&self, session_id: SessionId, payload: Arc<str>) -> Result<(), DeliveryError> {
        self.try_send(payload).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull(session_id),
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed(session_id),
        })
    }
}

/// Outcome of executing a batch of actions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Events successfully queued, counted per recipient
    pub delivered: usize,
    /// Per-recipient failures, in the order they happened
    pub failures: Vec<DeliveryError>,
}

impl DeliveryReport {
    /// True if every delivery succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.failures.extend(other.failures);
    }
}

/// Session → connection handle table plus action execution.
pub struct Dispatcher<H> {
    handles: HashMap<SessionId, H>,
}

impl<H: ConnectionHandle> Dispatcher<H> {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self { handles: HashMap::new() }
    }

    /// Register the handle for a session. Returns the handle it replaced.
    pub fn register(&mut self, session_id: SessionId, handle: H) -> Option<H> {
        self.handles.insert(session_id, handle)
    }

    /// Drop the handle for a session.
    ///
    /// For channel-backed handles this closes the outbound queue, which in
    /// turn ends the connection's writer.
    pub fn unregister(&mut self, session_id: SessionId) -> Option<H> {
        self.handles.remove(&session_id)
    }

    /// Session has a registered handle.
    pub fn is_registered(&self, session_id: SessionId) -> bool {
        self.handles.contains_key(&session_id)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Send one event to one session.
    pub fn send_to(
        &self,
        session_id: SessionId,
        message: &ServerMessage,
    ) -> Result<(), DeliveryError> {
        let payload = encode(message)?;
        self.deliver(session_id, payload)
    }

    /// Send one event to every recipient, in order.
    ///
    /// A session listed twice receives the event twice.
    pub fn broadcast(&self, recipients: &[SessionId], message: &ServerMessage) -> DeliveryReport {
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(err) => return DeliveryReport { delivered: 0, failures: vec![err] },
        };

        let mut report = DeliveryReport::default();
        for &session_id in recipients {
            match self.deliver(session_id, Arc::clone(&payload)) {
                Ok(()) => report.delivered += 1,
                Err(err) => report.failures.push(err),
            }
        }
        report
    }

    /// Execute driver actions in order.
    ///
    /// Failures are logged and collected; they never stop later actions.
    pub fn execute<I>(&mut self, actions: Vec<ServerAction<I>>) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, message } => {
                    match self.send_to(session_id, &message) {
                        Ok(()) => report.delivered += 1,
                        Err(err) => report.failures.push(err),
                    }
                },

                ServerAction::BroadcastToRoom { room_id, recipients, message } => {
                    let outcome = self.broadcast(&recipients, &message);
                    if !outcome.is_clean() {
                        tracing::debug!(
                            room = %room_id,
                            event = %message.kind(),
                            failed = outcome.failures.len(),
                            "broadcast partially delivered"
                        );
                    }
                    report.merge(outcome);
                },

                ServerAction::CloseConnection { session_id, reason } => {
                    tracing::info!(session_id, %reason, "closing connection");
                    self.unregister(session_id);
                },

                ServerAction::Log { level, message, .. } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                },
            }
        }

        for failure in &report.failures {
            match failure {
                DeliveryError::QueueFull(session_id) => {
                    tracing::warn!(session_id, "send queue full, dropping event");
                },
                DeliveryError::Encode(msg) => tracing::error!("event encode failed: {}", msg),
                other => tracing::debug!("delivery skipped: {}", other),
            }
        }

        report
    }

    fn deliver(&self, session_id: SessionId, payload: Arc<str>) -> Result<(), DeliveryError> {
        self.handles
            .get(&session_id)
            .ok_or(DeliveryError::UnknownSession(session_id))?
            .deliver(session_id, payload)
    }
}

impl<H: ConnectionHandle> Default for Dispatcher<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> std::fmt::Debug for Dispatcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("handles", &self.handles.len()).finish()
    }
}

fn encode(message: &ServerMessage) -> Result<Arc<str>, DeliveryError> {
    message.encode().map(Arc::from).map_err(|e| DeliveryError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(capacity: usize) -> (mpsc::Sender<Arc<str>>, mpsc::Receiver<Arc<str>>) {
        mpsc::channel(capacity)
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<str>>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(payload) = rx.try_recv() {
            out.push(payload.to_string());
        }
        out
    }

    #[test]
    fn send_to_registered_session() {
        let mut dispatcher = Dispatcher::new();
        let (tx, mut rx) = channel(4);
        dispatcher.register(1, tx);

        dispatcher.send_to(1, &ServerMessage::room_created("abcd1", "Animals")).unwrap();

        assert_eq!(drain(&mut rx), vec![
            r#"{"type":"room-created","room":"abcd1","name":"Animals","participants":1}"#
        ]);
    }

    #[test]
    fn send_to_unknown_session_fails() {
        let dispatcher: Dispatcher<mpsc::Sender<Arc<str>>> = Dispatcher::new();

        let result = dispatcher.send_to(9, &ServerMessage::room_created("r", "n"));
        assert_eq!(result.unwrap_err(), DeliveryError::UnknownSession(9));
    }

    #[test]
    fn broadcast_continues_past_failures() {
        let mut dispatcher = Dispatcher::new();
        let (tx1, mut rx1) = channel(4);
        let (tx2, rx2) = channel(4);
        let (tx3, mut rx3) = channel(4);
        dispatcher.register(1, tx1);
        dispatcher.register(2, tx2);
        dispatcher.register(3, tx3);
        drop(rx2);

        let report = dispatcher.broadcast(&[1, 2, 3], &ServerMessage::words_added("r", vec![]));

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures, vec![DeliveryError::Closed(2)]);
        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx3).len(), 1);
    }

    #[test]
    fn full_queue_drops_event_for_that_recipient_only() {
        let mut dispatcher = Dispatcher::new();
        let (slow, mut slow_rx) = channel(1);
        let (fast, mut fast_rx) = channel(8);
        dispatcher.register(1, slow);
        dispatcher.register(2, fast);

        let message = ServerMessage::words_added("r", vec!["a".to_string()]);
        dispatcher.broadcast(&[1, 2], &message);
        let report = dispatcher.broadcast(&[1, 2], &message);

        assert_eq!(report.failures, vec![DeliveryError::QueueFull(1)]);
        assert_eq!(drain(&mut slow_rx).len(), 1);
        assert_eq!(drain(&mut fast_rx).len(), 2);
    }

    #[test]
    fn duplicate_recipient_receives_twice() {
        let mut dispatcher = Dispatcher::new();
        let (tx, mut rx) = channel(4);
        dispatcher.register(1, tx);

        let report = dispatcher.broadcast(&[1, 1], &ServerMessage::words_added("r", vec![]));

        assert_eq!(report.delivered, 2);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn execute_runs_every_action() {
        let mut dispatcher = Dispatcher::new();
        let (tx1, mut rx1) = channel(4);
        let (tx2, mut rx2) = channel(4);
        dispatcher.register(1, tx1);
        dispatcher.register(2, tx2);

        let actions: Vec<ServerAction<u64>> = vec![
            ServerAction::Log { level: LogLevel::Info, message: "hello".to_string(), timestamp: 0 },
            ServerAction::SendToSession {
                session_id: 1,
                message: ServerMessage::room_created("r", "n"),
            },
            ServerAction::BroadcastToRoom {
                room_id: "r".to_string(),
                recipients: vec![1, 2, 7],
                message: ServerMessage::room_joined("r", "n", 2, vec![]),
            },
        ];

        let report = dispatcher.execute(actions);

        assert_eq!(report.delivered, 3);
        assert_eq!(report.failures, vec![DeliveryError::UnknownSession(7)]);
        assert_eq!(drain(&mut rx1).len(), 2);
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[test]
    fn close_connection_unregisters_handle() {
        let mut dispatcher = Dispatcher::new();
        let (tx, mut rx) = channel(4);
        dispatcher.register(1, tx);

        dispatcher.execute(vec![ServerAction::<u64>::CloseConnection {
            session_id: 1,
            reason: "max connections exceeded".to_string(),
        }]);

        assert!(!dispatcher.is_registered(1));
        assert!(dispatcher.is_empty());
        // Sender dropped, so the writer side sees the queue close
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
    }
}
