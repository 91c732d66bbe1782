//! The turn loop for turnkit.
//!
//! [`LlmClient`] completes a prompt and repairs replies its validator rejects,
//! [`ActionPlanner`] pairs a prompt with its augmentation to produce a plan, and
//! [`TurnKernel`] runs planning and dispatch for one conversational turn.

#![warn(missing_docs, clippy::pedantic)]

mod client;
mod error;
mod kernel;
mod planner;

pub use client::LlmClient;
pub use error::{KernelError, KernelResult};
pub use kernel::{ACTION_OUTPUTS_VARIABLE, TurnKernel, TurnOutcome, prompt_options};
pub use planner::{ActionPlanner, PlanningOutcome};
