//! Deterministic simulation harness for Word Pulse.
//!
//! [`SimEnv`] replaces wall-clock time and OS randomness with a virtual clock
//! and a seeded RNG. [`SimServer`] runs the real driver and dispatcher over
//! in-memory connection handles.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and real implementation,
//! and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;
pub mod sim_server;

pub use model::{
    ClientId, ModelRoom, ModelRoomId, ModelServer, Operation, OperationError, ROOM_SPACE,
    SmallWords, room_key,
};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_server::{HandleMode, SimHandle, SimServer};
