//! Configuration management for turnkit.
//!
//! [`RuntimeConfig`] gathers the settings threaded into the LLM client, the
//! planner, plan dispatch, and logging. It is loaded from JSON or YAML, with
//! every field optional, and can then be adjusted from `TURNKIT_*`
//! environment variables.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ENV_LOG, ENV_MAX_HISTORY_MESSAGES, ENV_MAX_REPAIR_ATTEMPTS, ENV_MAX_STEPS, load_from_path,
};
pub use schema::{ClientConfig, ExecutionConfig, LoggingConfig, RuntimeConfig};
