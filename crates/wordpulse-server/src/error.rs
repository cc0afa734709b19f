//! Runtime errors.
//!
//! These cover starting and running the server process. Failures inside the
//! room state machine are [`DriverError`]s; the event loop logs them and keeps
//! going. Only a refused connection is reported back to its caller.

use std::io;

use crate::server_error::ServerError as DriverError;

/// Errors returned by [`Server`](crate::Server) and [`LoopHandle`](crate::LoopHandle).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Unusable configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Requested bind address
        address: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Listener or socket I/O failed while serving.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The event-loop task is gone, so no message can reach the driver.
    #[error("event loop stopped")]
    LoopStopped,

    /// The driver refused a new connection.
    #[error("connection refused: {0}")]
    Refused(#[source] DriverError),
}
