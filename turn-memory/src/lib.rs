//! Turn-scoped memory for prompt rendering and action dispatch.
//!
//! Values are JSON documents addressed by dotted paths such as
//! `conversation.history` or `temp.input`. A path with a single segment lives in
//! the `temp` scope. [`MemoryFork`] layers writes over any [`Memory`] so retries can
//! scribble scratch state without touching the turn's real memory.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod fork;
mod path;
mod state;

pub use error::{MemoryError, MemoryResult};
pub use fork::MemoryFork;
pub use path::{CONVERSATION_SCOPE, TEMP_SCOPE, USER_SCOPE};
pub use state::{Memory, TurnState};
