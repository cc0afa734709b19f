//! Reference model for model-based testing.
//!
//! Operations are applied to both [`ModelServer`] and the real driver (via
//! [`SimServer`](crate::SimServer)); every client's received events and every
//! room's state must match.

mod operation;
mod server;

pub use operation::{
    ClientId, ModelRoomId, Operation, OperationError, ROOM_SPACE, SmallWords, room_key,
};
pub use server::{ModelRoom, ModelServer};
