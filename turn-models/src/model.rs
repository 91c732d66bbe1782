//! The completion model seam.

use async_trait::async_trait;
use turn_primitives::{Message, MessageRole, PromptResponse};
use turn_prompts::{PromptTemplate, RenderContext};

use crate::error::ModelResult;

/// Renders a prompt template and asks a model to complete it.
#[async_trait]
pub trait PromptCompletionModel: Send + Sync {
    /// Completes `template` using the memory, functions, tokenizer, and
    /// cancellation token bundled in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`](crate::ModelError) when rendering fails or the
    /// turn is cancelled. Provider failures are reported through the
    /// response status instead.
    async fn complete_prompt(
        &self,
        ctx: &RenderContext<'_>,
        template: &PromptTemplate,
    ) -> ModelResult<PromptResponse>;
}

/// Returns the trailing user message of a rendered prompt, recorded as the
/// response input for conversation history.
pub(crate) fn trailing_input(messages: &[Message]) -> Option<Message> {
    messages
        .last()
        .filter(|message| message.role() == MessageRole::User)
        .cloned()
}
