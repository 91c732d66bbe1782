//! Prompt rendering, response repair, and plan dispatch for LLM turns.
//!
//! Depend on this crate via `cargo add turnkit`. It bundles the runtime crates
//! behind feature flags so hosts can take only the layers they need, for
//! example the prompt renderer without the turn loop.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use turn_primitives as primitives;

/// Turn-scoped memory (enabled by `memory` feature).
#[cfg(feature = "memory")]
pub use turn_memory as memory;

/// Prompt sections and token-bounded rendering (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use turn_prompts as prompts;

/// Lenient JSON parsing, validators, and augmentations (enabled by `validation` feature).
#[cfg(feature = "validation")]
pub use turn_validation as validation;

/// Completion models and chat adapters (enabled by `models` feature).
#[cfg(feature = "models")]
pub use turn_models as models;

/// Action handlers and plan dispatch (enabled by `actions` feature).
#[cfg(feature = "actions")]
pub use turn_actions as actions;

/// Repairing client, planner, and turn loop (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use turn_kernel as kernel;

/// Configuration management (enabled by `config` feature).
#[cfg(feature = "config")]
pub use turn_config as config;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use turn_telemetry as telemetry;
