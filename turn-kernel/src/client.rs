//! Completion client that validates replies and repairs invalid ones.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use turn_config::ClientConfig;
use turn_memory::{Memory, MemoryFork};
use turn_models::PromptCompletionModel;
use turn_primitives::{Message, PromptResponse};
use turn_prompts::{ConversationHistory, PromptTemplate, RenderContext};
use turn_validation::PromptResponseValidator;

use crate::error::{KernelError, KernelResult};

const REPAIR_SUFFIX: &str = "-repair";

/// Wraps a completion model with validation, repair, and history bookkeeping.
///
/// An invalid reply is fed back to the model together with the validator's
/// feedback, up to [`ClientConfig::max_repair_attempts`] times. Repairs render
/// against a [`MemoryFork`], so only the final accepted exchange reaches the
/// caller's conversation history.
pub struct LlmClient {
    model: Arc<dyn PromptCompletionModel>,
    config: ClientConfig,
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Creates a client around `model`.
    #[must_use]
    pub fn new(model: Arc<dyn PromptCompletionModel>, config: ClientConfig) -> Self {
        Self { model, config }
    }

    /// Returns the client settings.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Completes `template` and validates the reply with `validator`.
    ///
    /// Provider failures come back as non-success responses untouched. A reply
    /// that stays invalid after every repair comes back with the
    /// `invalid_response` status and the last feedback in its error text.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Cancelled`] when the turn is cancelled, and the
    /// model, validator, or memory failure that stopped the exchange otherwise.
    pub async fn complete_prompt<V>(
        &self,
        ctx: &RenderContext<'_>,
        template: &PromptTemplate,
        validator: &V,
    ) -> KernelResult<PromptResponse>
    where
        V: PromptResponseValidator + ?Sized,
    {
        let response = self.model.complete_prompt(ctx, template).await?;
        if !response.is_success() {
            debug!(
                prompt = template.name(),
                status = ?response.status(),
                "completion did not succeed"
            );
            return Ok(response);
        }

        let validation = validator
            .validate_response(
                ctx.memory,
                ctx.tokenizer,
                &response,
                self.config.max_repair_attempts,
            )
            .await?;
        if validation.is_valid() {
            let response = response.with_value(validation.into_value());
            self.add_to_history(ctx.memory, &response)?;
            return Ok(response);
        }

        let feedback = validation.feedback().unwrap_or_default().to_owned();
        if self.config.max_repair_attempts == 0 {
            return Ok(invalid_after_repairs(&feedback));
        }
        self.repair(ctx, template, validator, response, feedback)
            .await
    }

    async fn repair<V>(
        &self,
        ctx: &RenderContext<'_>,
        template: &PromptTemplate,
        validator: &V,
        original: PromptResponse,
        mut feedback: String,
    ) -> KernelResult<PromptResponse>
    where
        V: PromptResponseValidator + ?Sized,
    {
        let input = self.resolve_input(ctx.memory, &original);
        let repair_variable = format!("{}{REPAIR_SUFFIX}", self.config.history_variable);
        let fork = MemoryFork::new(ctx.memory);
        let repair_template = template.with_section(Arc::new(
            ConversationHistory::new(repair_variable.clone()).mark_required(),
        ));
        let fork_ctx = RenderContext::new(&fork, ctx.functions, ctx.tokenizer, ctx.cancel);

        let mut last_reply = reply_message(&original);
        let mut remaining = self.config.max_repair_attempts;
        while remaining > 0 {
            ctx.check_cancelled()?;
            append_messages(
                &fork,
                &repair_variable,
                [last_reply.clone(), Message::user(feedback.clone())],
                usize::MAX,
            )?;
            self.log_repair(template.name(), remaining, &feedback);

            remaining -= 1;
            let response = self
                .model
                .complete_prompt(&fork_ctx, &repair_template)
                .await?;
            if !response.is_success() {
                return Ok(response.with_input(input));
            }

            let validation = validator
                .validate_response(&fork, ctx.tokenizer, &response, remaining)
                .await?;
            if validation.is_valid() {
                let response = response
                    .with_input(input)
                    .with_value(validation.into_value());
                self.add_to_history(ctx.memory, &response)?;
                info!(
                    prompt = template.name(),
                    attempts = self.config.max_repair_attempts - remaining,
                    "model response repaired"
                );
                return Ok(response);
            }

            last_reply = reply_message(&response);
            feedback = validation.feedback().unwrap_or_default().to_owned();
        }

        warn!(
            prompt = template.name(),
            attempts = self.config.max_repair_attempts,
            "model response could not be repaired"
        );
        Ok(invalid_after_repairs(&feedback))
    }

    fn log_repair(&self, prompt: &str, remaining: usize, feedback: &str) {
        if self.config.log_repairs {
            info!(prompt, remaining, feedback, "repairing model response");
        } else {
            debug!(prompt, remaining, feedback, "repairing model response");
        }
    }

    fn resolve_input(&self, memory: &dyn Memory, response: &PromptResponse) -> Option<Message> {
        if let Some(input) = response.input() {
            return Some(input.clone());
        }
        match memory.get_value(&self.config.input_variable) {
            Some(Value::String(text)) if !text.is_empty() => Some(Message::user(text)),
            _ => None,
        }
    }

    fn add_to_history(&self, memory: &dyn Memory, response: &PromptResponse) -> KernelResult<()> {
        if self.config.max_history_messages == 0 {
            return Ok(());
        }
        let messages = self
            .resolve_input(memory, response)
            .into_iter()
            .chain(response.message().cloned());
        append_messages(
            memory,
            &self.config.history_variable,
            messages,
            self.config.max_history_messages,
        )
    }
}

fn reply_message(response: &PromptResponse) -> Message {
    response
        .message()
        .cloned()
        .unwrap_or_else(|| Message::assistant(response.text()))
}

fn invalid_after_repairs(feedback: &str) -> PromptResponse {
    PromptResponse::invalid_response(format!(
        "Reached max model response repair attempts. Last feedback given to model: \"{feedback}\""
    ))
}

/// Appends `messages` to the array at `variable`, keeping the newest `max`.
fn append_messages(
    memory: &dyn Memory,
    variable: &str,
    messages: impl IntoIterator<Item = Message>,
    max: usize,
) -> KernelResult<()> {
    let mut entries = match memory.get_value(variable) {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };
    for message in messages {
        let entry =
            serde_json::to_value(&message).map_err(|err| KernelError::history(err.to_string()))?;
        entries.push(entry);
    }
    let excess = entries.len().saturating_sub(max);
    entries.drain(..excess);
    memory.set_value(variable, Value::Array(entries))?;
    Ok(())
}
