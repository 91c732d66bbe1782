//! Turning a named prompt into a validated plan.

use std::sync::Arc;

use tracing::{debug, info};
use turn_memory::Memory;
use turn_primitives::{CancellationToken, Plan, PromptResponse, Tokenizer};
use turn_prompts::{PromptManager, RenderContext};
use turn_validation::create_augmentation;

use crate::client::LlmClient;
use crate::error::KernelResult;

/// What planning produced for a turn.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanningOutcome {
    response: PromptResponse,
    plan: Option<Plan>,
}

impl PlanningOutcome {
    /// Returns the final model response.
    #[must_use]
    pub fn response(&self) -> &PromptResponse {
        &self.response
    }

    /// Returns the plan, present only when the response succeeded.
    #[must_use]
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Splits the outcome into its response and plan.
    #[must_use]
    pub fn into_parts(self) -> (PromptResponse, Option<Plan>) {
        (self.response, self.plan)
    }
}

/// Completes a prompt with its augmentation and builds the resulting plan.
///
/// The prompt's [`AugmentationType`](turn_prompts::AugmentationType) selects the
/// augmentation; its instructions are prepended to the prompt and it validates
/// every reply the [`LlmClient`] receives, repairs included.
#[derive(Debug)]
pub struct ActionPlanner {
    client: LlmClient,
    prompts: Arc<PromptManager>,
    default_prompt: String,
}

impl ActionPlanner {
    /// Creates a planner that completes `default_prompt` from `prompts`.
    #[must_use]
    pub fn new(
        client: LlmClient,
        prompts: Arc<PromptManager>,
        default_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            prompts,
            default_prompt: default_prompt.into(),
        }
    }

    /// Returns the completion client.
    #[must_use]
    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    /// Returns the prompt registry.
    #[must_use]
    pub fn prompts(&self) -> &Arc<PromptManager> {
        &self.prompts
    }

    /// Returns the name of the prompt used for each turn.
    #[must_use]
    pub fn default_prompt(&self) -> &str {
        &self.default_prompt
    }

    /// Plans a turn with the default prompt.
    ///
    /// # Errors
    ///
    /// See [`ActionPlanner::plan_with`].
    pub async fn begin_task(
        &self,
        memory: &dyn Memory,
        tokenizer: &dyn Tokenizer,
        cancel: &CancellationToken,
    ) -> KernelResult<PlanningOutcome> {
        self.plan_with(&self.default_prompt, memory, tokenizer, cancel)
            .await
    }

    /// Plans a turn with the named prompt.
    ///
    /// A response that is not a success yields an outcome without a plan.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Prompt`](crate::KernelError::Prompt) when the prompt
    /// cannot be loaded, [`KernelError::Validator`](crate::KernelError::Validator)
    /// when the augmentation cannot be built or cannot turn an accepted reply
    /// into a plan, and any failure from [`LlmClient::complete_prompt`].
    pub async fn plan_with(
        &self,
        prompt: &str,
        memory: &dyn Memory,
        tokenizer: &dyn Tokenizer,
        cancel: &CancellationToken,
    ) -> KernelResult<PlanningOutcome> {
        let template = self.prompts.get_prompt(prompt).await?;
        let augmentation = create_augmentation(
            template.config().augmentation.augmentation_type,
            template.actions(),
        )?;
        let template = match augmentation.create_prompt_section() {
            Some(section) => template.with_instructions(section),
            None => template,
        };
        debug!(
            prompt,
            augmentation = ?augmentation.kind(),
            actions = template.actions().len(),
            "planning turn"
        );

        let ctx = RenderContext::new(memory, self.prompts.functions(), tokenizer, cancel);
        let response = self
            .client
            .complete_prompt(&ctx, &template, augmentation.as_ref())
            .await?;
        if !response.is_success() {
            info!(prompt, status = ?response.status(), "planning produced no plan");
            return Ok(PlanningOutcome {
                response,
                plan: None,
            });
        }

        let plan = augmentation
            .create_plan_from_response(memory, &response)
            .await?;
        debug!(prompt, commands = plan.len(), "plan ready");
        Ok(PlanningOutcome {
            response,
            plan: Some(plan),
        })
    }
}
