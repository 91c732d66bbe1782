//! Error types for completion models.

use thiserror::Error;
use turn_prompts::PromptError;

/// Result alias for completion model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Failures that prevent a completion from producing any response.
///
/// Provider failures are not errors: they come back as a
/// [`PromptResponse`](turn_primitives::PromptResponse) with an `error` or
/// `rate_limited` status so the caller decides how to proceed.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The completion was cancelled through the turn's cancellation token.
    #[error("completion cancelled")]
    Cancelled,

    /// The prompt could not be rendered.
    #[error("failed to render prompt: {0}")]
    Prompt(PromptError),
}

impl From<PromptError> for ModelError {
    fn from(value: PromptError) -> Self {
        match value {
            PromptError::Cancelled => Self::Cancelled,
            other => Self::Prompt(other),
        }
    }
}
