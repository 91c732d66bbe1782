//! Error types for action registration and plan dispatch.

use std::time::Duration;

use thiserror::Error;

/// Result alias for action operations.
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors produced by the action registry and the plan executor.
///
/// Unknown actions are not errors; they are routed to the registry's
/// unknown-action handler.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Dispatch was cancelled through the turn's cancellation token.
    #[error("plan execution cancelled")]
    Cancelled,

    /// Action name collided with an existing registration.
    #[error("action `{name}` is already registered")]
    DuplicateAction {
        /// Name of the offending action.
        name: String,
    },

    /// A handler failed; the rest of the plan is abandoned.
    #[error("action `{action}` failed: {reason}")]
    Handler {
        /// Name of the failing action.
        action: String,
        /// Human-readable error returned by the handler.
        reason: String,
    },

    /// The output channel rejected a SAY message.
    #[error("output channel failed: {reason}")]
    Output {
        /// Human-readable error returned by the channel.
        reason: String,
    },

    /// The plan has more commands than the executor allows.
    #[error("plan has {steps} commands, more than the limit of {max_steps}")]
    TooManySteps {
        /// Commands in the plan.
        steps: usize,
        /// Configured limit.
        max_steps: usize,
    },

    /// Execution ran past its wall-clock limit.
    #[error("plan execution exceeded {max_time:?}")]
    TimedOut {
        /// Configured limit.
        max_time: Duration,
    },
}

impl ActionError {
    /// Creates a handler failure for `action`.
    #[must_use]
    pub fn handler(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Handler {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Creates an output channel failure.
    #[must_use]
    pub fn output(reason: impl Into<String>) -> Self {
        Self::Output {
            reason: reason.into(),
        }
    }
}
