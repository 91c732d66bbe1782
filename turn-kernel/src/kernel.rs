//! One conversational turn: plan, then dispatch.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};
use turn_actions::{ActionOutput, ExecutionLimits, ExecutionOutcome, PlanExecutor};
use turn_config::RuntimeConfig;
use turn_memory::Memory;
use turn_models::PromptCompletionModel;
use turn_primitives::{CancellationToken, CharTokenizer, Plan, PromptResponse, Tokenizer};
use turn_prompts::{PromptManager, PromptManagerOptions};

use crate::client::LlmClient;
use crate::error::KernelResult;
use crate::planner::ActionPlanner;

/// Memory path receiving the outputs of native action calls, keyed by call id.
pub const ACTION_OUTPUTS_VARIABLE: &str = "temp.action_outputs";

/// Everything a turn produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    response: PromptResponse,
    plan: Option<Plan>,
    execution: Option<ExecutionOutcome>,
}

impl TurnOutcome {
    /// Returns the final model response.
    #[must_use]
    pub fn response(&self) -> &PromptResponse {
        &self.response
    }

    /// Returns the dispatched plan, if planning succeeded.
    #[must_use]
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Returns the dispatch summary, if a plan ran.
    #[must_use]
    pub fn execution(&self) -> Option<&ExecutionOutcome> {
        self.execution.as_ref()
    }
}

/// Runs turns for a host application.
///
/// `C` is the host's turn context handed to every action handler and `S` the
/// turn state the prompt renders from and the handlers mutate.
pub struct TurnKernel<C: ?Sized, S> {
    planner: ActionPlanner,
    executor: PlanExecutor<C, S>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl<C: ?Sized, S> fmt::Debug for TurnKernel<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnKernel")
            .field("planner", &self.planner)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl<C, S> TurnKernel<C, S>
where
    C: ?Sized + Send + Sync + 'static,
    S: Memory + 'static,
{
    /// Creates a kernel from a planner and an executor.
    #[must_use]
    pub fn new(planner: ActionPlanner, executor: PlanExecutor<C, S>) -> Self {
        Self {
            planner,
            executor,
            tokenizer: Arc::new(CharTokenizer),
        }
    }

    /// Wires a kernel from runtime configuration.
    ///
    /// Client settings go to the [`LlmClient`] and execution settings become the
    /// executor's limits, replacing any limits already set on `executor`.
    #[must_use]
    pub fn from_config(
        config: &RuntimeConfig,
        model: Arc<dyn PromptCompletionModel>,
        prompts: Arc<PromptManager>,
        default_prompt: impl Into<String>,
        executor: PlanExecutor<C, S>,
    ) -> Self {
        let client = LlmClient::new(model, config.client.clone());
        let limits = ExecutionLimits {
            max_steps: Some(config.execution.max_steps),
            max_time: Some(config.execution.max_time()),
        };
        Self::new(
            ActionPlanner::new(client, prompts, default_prompt),
            executor.with_limits(limits),
        )
    }

    /// Measures and truncates prompts with `tokenizer` instead of the
    /// character-count default.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Returns the planner.
    #[must_use]
    pub fn planner(&self) -> &ActionPlanner {
        &self.planner
    }

    /// Returns the executor.
    #[must_use]
    pub fn executor(&self) -> &PlanExecutor<C, S> {
        &self.executor
    }

    /// Plans and dispatches one turn.
    ///
    /// When planning does not succeed the outcome carries the failed response
    /// and nothing is dispatched. Outputs of native action calls are written to
    /// [`ACTION_OUTPUTS_VARIABLE`].
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Cancelled`](crate::KernelError::Cancelled) when
    /// `cancel` fires, and any planning, dispatch, or memory failure.
    pub async fn run(
        &self,
        context: Arc<C>,
        state: Arc<S>,
        cancel: &CancellationToken,
    ) -> KernelResult<TurnOutcome> {
        let planning = self
            .planner
            .begin_task(state.as_ref(), self.tokenizer.as_ref(), cancel)
            .await?;
        let (response, plan) = planning.into_parts();
        let Some(plan) = plan else {
            return Ok(TurnOutcome {
                response,
                plan: None,
                execution: None,
            });
        };

        let execution = self
            .executor
            .execute(context, Arc::clone(&state), &plan, cancel)
            .await?;
        record_action_outputs(state.as_ref(), execution.outputs())?;
        info!(
            status = ?execution.status(),
            steps = execution.steps(),
            "turn complete"
        );
        Ok(TurnOutcome {
            response,
            plan: Some(plan),
            execution: Some(execution),
        })
    }
}

/// Builds prompt manager options that share the client's memory paths.
#[must_use]
pub fn prompt_options(config: &RuntimeConfig) -> PromptManagerOptions {
    PromptManagerOptions {
        prompts_folder: config.prompts_folder.clone(),
        history_variable: config.client.history_variable.clone(),
        input_variable: config.client.input_variable.clone(),
    }
}

fn record_action_outputs(memory: &dyn Memory, outputs: &[ActionOutput]) -> KernelResult<()> {
    let recorded: Map<String, Value> = outputs
        .iter()
        .filter_map(|output| {
            output
                .action_id
                .as_ref()
                .map(|id| (id.clone(), Value::String(output.output.clone())))
        })
        .collect();
    if recorded.is_empty() {
        return Ok(());
    }
    debug!(calls = recorded.len(), "recording action call outputs");
    memory.set_value(ACTION_OUTPUTS_VARIABLE, Value::Object(recorded))?;
    Ok(())
}
