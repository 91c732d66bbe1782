//! Error types for the turn loop.

use thiserror::Error;
use turn_actions::ActionError;
use turn_memory::MemoryError;
use turn_models::ModelError;
use turn_prompts::PromptError;
use turn_validation::ValidatorError;

/// Result alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Failures that abort a turn.
///
/// Every layer's cancellation collapses into [`KernelError::Cancelled`] so hosts
/// only need to match one variant.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The turn was cancelled through its cancellation token.
    #[error("turn cancelled")]
    Cancelled,

    /// The completion model failed before producing a response.
    #[error(transparent)]
    Model(ModelError),

    /// A validator or augmentation failed.
    #[error(transparent)]
    Validator(ValidatorError),

    /// Plan dispatch failed.
    #[error(transparent)]
    Action(ActionError),

    /// A prompt could not be loaded or rendered.
    #[error(transparent)]
    Prompt(PromptError),

    /// Reading or writing turn memory failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The conversation history could not be updated.
    #[error("failed to update conversation history: {reason}")]
    History {
        /// Human-readable reason for the failure.
        reason: String,
    },
}

impl KernelError {
    /// Creates a history error from the supplied reason.
    #[must_use]
    pub fn history(reason: impl Into<String>) -> Self {
        Self::History {
            reason: reason.into(),
        }
    }
}

impl From<ModelError> for KernelError {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::Cancelled => Self::Cancelled,
            other => Self::Model(other),
        }
    }
}

impl From<ValidatorError> for KernelError {
    fn from(value: ValidatorError) -> Self {
        match value {
            ValidatorError::Cancelled => Self::Cancelled,
            other => Self::Validator(other),
        }
    }
}

impl From<ActionError> for KernelError {
    fn from(value: ActionError) -> Self {
        match value {
            ActionError::Cancelled => Self::Cancelled,
            other => Self::Action(other),
        }
    }
}

impl From<PromptError> for KernelError {
    fn from(value: PromptError) -> Self {
        match value {
            PromptError::Cancelled => Self::Cancelled,
            other => Self::Prompt(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_collapses_across_layers() {
        assert!(matches!(
            KernelError::from(ModelError::Cancelled),
            KernelError::Cancelled
        ));
        assert!(matches!(
            KernelError::from(ValidatorError::Cancelled),
            KernelError::Cancelled
        ));
        assert!(matches!(
            KernelError::from(ActionError::Cancelled),
            KernelError::Cancelled
        ));
        assert!(matches!(
            KernelError::from(PromptError::Cancelled),
            KernelError::Cancelled
        ));
        assert!(matches!(
            KernelError::from(ActionError::output("closed")),
            KernelError::Action(_)
        ));
    }
}
