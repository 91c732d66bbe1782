//! Error types for prompt rendering and prompt loading.

use std::path::PathBuf;

use thiserror::Error;
use turn_memory::MemoryError;

/// Result alias for prompt operations.
pub type PromptResult<T> = Result<T, PromptError>;

/// Errors produced while building, loading, or rendering prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Rendering was cancelled through the turn's cancellation token.
    #[error("prompt rendering cancelled")]
    Cancelled,

    /// A template could not be parsed.
    #[error("invalid template: {reason}")]
    InvalidTemplate {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A template referenced a function that is not registered.
    #[error("template function `{name}` is not registered")]
    UnknownFunction {
        /// Name of the missing function.
        name: String,
    },

    /// A function name collided with an existing registration.
    #[error("template function `{name}` is already registered")]
    DuplicateFunction {
        /// Name of the offending function.
        name: String,
    },

    /// A template function failed.
    #[error("template function `{name}` failed: {reason}")]
    Function {
        /// Name of the failing function.
        name: String,
        /// Error reported by the function.
        reason: String,
    },

    /// Reading or writing turn memory failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// A prompt folder could not be read.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A prompt configuration or action file was malformed.
    #[error("invalid prompt configuration for `{name}`: {reason}")]
    Config {
        /// Name of the prompt being loaded.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A prompt name collided with an existing registration.
    #[error("prompt `{name}` is already registered")]
    DuplicatePrompt {
        /// Name of the offending prompt.
        name: String,
    },

    /// The requested prompt is neither registered nor present on disk.
    #[error("prompt `{name}` not found")]
    NotFound {
        /// Name of the missing prompt.
        name: String,
    },
}

impl PromptError {
    /// Creates a template error from the supplied reason.
    #[must_use]
    pub fn invalid_template(reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            reason: reason.into(),
        }
    }

    /// Creates a function failure for `name`.
    #[must_use]
    pub fn function(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
