//! Plan dispatch for turnkit.
//!
//! Hosts register one [`ActionHandler`] per action name in an
//! [`ActionRegistry`]; a [`PlanExecutor`] then runs each validated plan in
//! order, sending SAY messages to an [`OutputChannel`] and stopping early when
//! a handler returns [`STOP_COMMAND`].

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod executor;
mod handler;
mod output;
mod registry;

pub use error::{ActionError, ActionResult};
pub use executor::{
    ActionOutput, ExecutionLimits, ExecutionOutcome, ExecutionStatus, PlanExecutor, PlanReadyHook,
};
pub use handler::{ActionHandler, STOP_COMMAND, UnknownActionHandler};
pub use output::{CollectingChannel, OutputChannel, TracingChannel};
pub use registry::ActionRegistry;
