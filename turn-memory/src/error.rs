//! Error types for the memory subsystem.

use thiserror::Error;

/// Errors emitted by memory components.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The supplied path was empty or contained an empty segment.
    #[error("invalid memory path `{path}`")]
    InvalidPath {
        /// The offending path.
        path: String,
    },
    /// A write tried to descend through a value that is not an object.
    #[error("memory value at `{path}` is not an object")]
    NotAnObject {
        /// Path of the non-object value.
        path: String,
    },
}

/// Result type alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
