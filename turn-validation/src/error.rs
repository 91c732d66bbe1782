//! Error types for validators and augmentations.

use thiserror::Error;
use turn_memory::MemoryError;
use turn_prompts::PromptError;

/// Result alias for validation operations.
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Failures that stop validation itself, as opposed to invalid replies.
///
/// A malformed reply is not an error: it produces an invalid
/// [`Validation`](crate::Validation) carrying feedback for the model.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Validation was cancelled through the turn's cancellation token.
    #[error("validation cancelled")]
    Cancelled,

    /// A schema or action list could not be turned into prompt text.
    #[error("invalid augmentation setup: {reason}")]
    Setup {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A plan was requested for a reply that carries no usable value.
    #[error("cannot build a plan: {reason}")]
    MissingValue {
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// Reading or writing turn memory failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Building a prompt section failed.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl ValidatorError {
    /// Creates a setup error from the supplied reason.
    #[must_use]
    pub fn setup(reason: impl Into<String>) -> Self {
        Self::Setup {
            reason: reason.into(),
        }
    }

    /// Creates a missing-value error from the supplied reason.
    #[must_use]
    pub fn missing_value(reason: impl Into<String>) -> Self {
        Self::MissingValue {
            reason: reason.into(),
        }
    }
}
