//! Word Pulse wire protocol.
//!
//! Every message on a Word Pulse connection is a single JSON object carrying a
//! `type` discriminator. Clients send [`ClientCommand`]s, the server answers
//! with [`ServerMessage`]s. Both are closed sets: anything the decoder does not
//! recognise becomes a [`ProtocolError`] instead of a loosely-typed value.
//!
//! # Invariants
//!
//! - Decoding never panics. Arbitrary input yields either a command or an
//!   error.
//! - Each variant maps to exactly one `type` string, enforced by match
//!   exhaustiveness in [`CommandKind`].
//! - `words` snapshots are serialized in stored order, never sorted or
//!   de-duplicated.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod errors;
pub mod event;

pub use command::{ClientCommand, CommandKind};
pub use errors::{ProtocolError, Result};
pub use event::{EventKind, ServerMessage};
