//! Word Pulse core.
//!
//! Pure room state with no I/O: the [`Room`] record, its append-only
//! [`WordLedger`], and the [`Environment`](env::Environment) abstraction that
//! supplies time and randomness. The server crate drives these types; the
//! harness crate swaps in a deterministic environment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod ledger;
pub mod room;

pub use ledger::{WordCount, WordLedger, tokenize, word_counts};
pub use room::{Room, RoomSnapshot, SessionId};
