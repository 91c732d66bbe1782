//! Sequential plan execution.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use turn_primitives::{CancellationToken, Command, Plan};

use crate::error::{ActionError, ActionResult};
use crate::handler::STOP_COMMAND;
use crate::output::{OutputChannel, TracingChannel};
use crate::registry::ActionRegistry;

/// Limits applied to a single plan execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum number of commands a plan may contain.
    pub max_steps: Option<usize>,
    /// Wall-clock budget for the whole plan.
    pub max_time: Option<Duration>,
}

/// Hook consulted once a plan is ready, before any command runs.
#[async_trait]
pub trait PlanReadyHook<C, S>: Send + Sync
where
    C: ?Sized + Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    /// Returns `false` to skip the plan entirely.
    ///
    /// # Errors
    ///
    /// Any error aborts execution and is returned to the caller.
    async fn on_plan_ready(&self, context: &C, state: &S, plan: &Plan) -> ActionResult<bool>;
}

/// How a plan execution ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Every command ran.
    Completed,
    /// A handler returned [`STOP_COMMAND`].
    Stopped,
    /// The plan-ready hook rejected the plan.
    Vetoed,
}

/// Result of one DO command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionOutput {
    /// Name of the action.
    pub action: String,
    /// Identifier of the native action call, if the command came from one.
    pub action_id: Option<String>,
    /// String returned by the handler.
    pub output: String,
}

/// Summary of a plan execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    status: ExecutionStatus,
    steps: usize,
    outputs: Vec<ActionOutput>,
}

impl ExecutionOutcome {
    /// Returns how execution ended.
    #[must_use]
    pub const fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// Returns the number of commands that ran.
    #[must_use]
    pub const fn steps(&self) -> usize {
        self.steps
    }

    /// Returns the DO results in execution order.
    #[must_use]
    pub fn outputs(&self) -> &[ActionOutput] {
        &self.outputs
    }
}

/// Runs plans command by command against an [`ActionRegistry`].
///
/// DO commands go to the registered handler, or to the unknown-action handler
/// for unregistered names; SAY commands go to the output channel. Commands
/// never run concurrently or out of order.
pub struct PlanExecutor<C: ?Sized, S: ?Sized> {
    registry: Arc<ActionRegistry<C, S>>,
    output: Arc<dyn OutputChannel>,
    limits: ExecutionLimits,
    plan_ready: Option<Arc<dyn PlanReadyHook<C, S>>>,
}

impl<C: ?Sized, S: ?Sized> fmt::Debug for PlanExecutor<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("registry", &self.registry)
            .field("limits", &self.limits)
            .field("plan_ready_configured", &self.plan_ready.is_some())
            .finish_non_exhaustive()
    }
}

impl<C, S> PlanExecutor<C, S>
where
    C: ?Sized + Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    /// Creates an executor that logs SAY messages to tracing.
    #[must_use]
    pub fn new(registry: Arc<ActionRegistry<C, S>>) -> Self {
        Self {
            registry,
            output: Arc::new(TracingChannel),
            limits: ExecutionLimits::default(),
            plan_ready: None,
        }
    }

    /// Sends SAY messages to `output`.
    #[must_use]
    pub fn with_output(mut self, output: Arc<dyn OutputChannel>) -> Self {
        self.output = output;
        self
    }

    /// Applies step and time limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Installs the plan-ready hook.
    #[must_use]
    pub fn with_plan_ready_hook(mut self, hook: Arc<dyn PlanReadyHook<C, S>>) -> Self {
        self.plan_ready = Some(hook);
        self
    }

    /// Returns the action registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ActionRegistry<C, S>> {
        &self.registry
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Executes `plan`.
    ///
    /// # Errors
    ///
    /// Returns the first handler or output failure, which abandons the rest of
    /// the plan, [`ActionError::TooManySteps`] or [`ActionError::TimedOut`] when
    /// a limit is exceeded, and [`ActionError::Cancelled`] when `cancel` fires
    /// between commands.
    pub async fn execute(
        &self,
        context: Arc<C>,
        state: Arc<S>,
        plan: &Plan,
        cancel: &CancellationToken,
    ) -> ActionResult<ExecutionOutcome> {
        if let Some(hook) = &self.plan_ready {
            if !hook.on_plan_ready(&context, &state, plan).await? {
                info!(commands = plan.len(), "plan vetoed before execution");
                return Ok(ExecutionOutcome {
                    status: ExecutionStatus::Vetoed,
                    steps: 0,
                    outputs: Vec::new(),
                });
            }
        }
        if let Some(max_steps) = self.limits.max_steps {
            if plan.len() > max_steps {
                return Err(ActionError::TooManySteps {
                    steps: plan.len(),
                    max_steps,
                });
            }
        }

        let started = Instant::now();
        let mut outputs = Vec::new();
        for (step, command) in plan.commands().iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ActionError::Cancelled);
            }
            let remaining = self.remaining_time(started)?;

            match command {
                Command::Say(say) => {
                    debug!(step, "sending SAY command");
                    self.within(remaining, self.output.send(say.response.clone()))
                        .await?;
                }
                Command::Do(command) => {
                    let (handler, known) = self.registry.resolve(&command.action);
                    if !known {
                        debug!(step, action = %command.action, "routing to unknown-action handler");
                    }
                    let result = self
                        .within(
                            remaining,
                            handler.handle(
                                Arc::clone(&context),
                                Arc::clone(&state),
                                command.parameters.clone(),
                                command.action.clone(),
                            ),
                        )
                        .await;
                    let output = result.inspect_err(|err| {
                        warn!(step, action = %command.action, error = %err, "action failed; abandoning plan");
                    })?;
                    debug!(step, action = %command.action, output = %output, "action completed");

                    let stop = output == STOP_COMMAND;
                    outputs.push(ActionOutput {
                        action: command.action.clone(),
                        action_id: command.action_id.clone(),
                        output,
                    });
                    if stop {
                        info!(step, action = %command.action, "plan stopped by action");
                        return Ok(ExecutionOutcome {
                            status: ExecutionStatus::Stopped,
                            steps: step + 1,
                            outputs,
                        });
                    }
                }
            }
        }

        Ok(ExecutionOutcome {
            status: ExecutionStatus::Completed,
            steps: plan.len(),
            outputs,
        })
    }

    fn remaining_time(&self, started: Instant) -> ActionResult<Option<Duration>> {
        let Some(max_time) = self.limits.max_time else {
            return Ok(None);
        };
        max_time
            .checked_sub(started.elapsed())
            .filter(|remaining| !remaining.is_zero())
            .map(Some)
            .ok_or(ActionError::TimedOut { max_time })
    }

    async fn within<T>(
        &self,
        remaining: Option<Duration>,
        future: impl Future<Output = ActionResult<T>>,
    ) -> ActionResult<T> {
        match (remaining, self.limits.max_time) {
            (Some(remaining), Some(max_time)) => tokio::time::timeout(remaining, future)
                .await
                .map_err(|_| ActionError::TimedOut { max_time })?,
            _ => future.await,
        }
    }
}
