//! Shared error definitions for turn primitives.

use thiserror::Error;

/// Result alias used throughout the turn runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Action name failed validation.
    #[error("invalid action name `{name}`: {reason}")]
    InvalidActionName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Message content was not usable for the requested operation.
    #[error("invalid message: {reason}")]
    InvalidMessage {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The operation observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,
}
