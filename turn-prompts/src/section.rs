//! The section trait and the values exchanged during a render pass.

use async_trait::async_trait;
use turn_memory::Memory;
use turn_primitives::{CancellationToken, Message, Tokenizer};

use crate::error::{PromptError, PromptResult};
use crate::functions::{FunctionContext, PromptFunctions};

/// Token cost charged for each image attached to a message.
pub const IMAGE_TOKEN_COST: usize = 85;

/// How many tokens a section may claim from its parent's budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SectionBudget {
    /// Take whatever the section needs from the remaining budget.
    Auto,
    /// Cap the section at a fixed number of tokens.
    Fixed(usize),
    /// Take a fraction of what remains after fixed and auto sections.
    Share(f32),
}

impl SectionBudget {
    /// Interprets a numeric `tokens` setting: zero or negative means auto, values
    /// in `(0, 1]` are shares and larger values are fixed caps.
    #[must_use]
    pub fn from_tokens(tokens: f64) -> Self {
        if tokens <= 0.0 {
            Self::Auto
        } else if tokens <= 1.0 {
            #[allow(clippy::cast_possible_truncation)]
            Self::Share(tokens as f32)
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::Fixed(tokens as usize)
        }
    }

    /// Returns the cap this budget places on `max_tokens`.
    #[must_use]
    pub fn cap(self, max_tokens: usize) -> usize {
        match self {
            Self::Fixed(tokens) => tokens.min(max_tokens),
            Self::Auto | Self::Share(_) => max_tokens,
        }
    }
}

/// Output of rendering a section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedSection<T> {
    /// Rendered text or messages.
    pub output: T,
    /// Tokens consumed by `output`.
    pub length: usize,
    /// `true` when `length` exceeds the budget the section was given.
    pub too_long: bool,
}

impl<T> RenderedSection<T> {
    /// Wraps `output`, flagging it when `length` exceeds `max_tokens`.
    #[must_use]
    pub fn new(output: T, length: usize, max_tokens: usize) -> Self {
        Self {
            output,
            length,
            too_long: length > max_tokens,
        }
    }
}

/// Borrowed turn resources available to every section during a render pass.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// Turn memory.
    pub memory: &'a dyn Memory,
    /// Template function registry.
    pub functions: &'a PromptFunctions,
    /// Tokenizer used for measurement and truncation.
    pub tokenizer: &'a dyn Tokenizer,
    /// Cooperative cancellation for the turn.
    pub cancel: &'a CancellationToken,
}

impl<'a> RenderContext<'a> {
    /// Bundles the resources for a render pass.
    #[must_use]
    pub fn new(
        memory: &'a dyn Memory,
        functions: &'a PromptFunctions,
        tokenizer: &'a dyn Tokenizer,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            memory,
            functions,
            tokenizer,
            cancel,
        }
    }

    /// Returns the subset of resources exposed to template functions.
    #[must_use]
    pub fn function_context(&self) -> FunctionContext<'a> {
        FunctionContext {
            memory: self.memory,
            tokenizer: self.tokenizer,
        }
    }

    /// Fails with [`PromptError::Cancelled`] once the turn has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Cancelled`] when the token has fired.
    pub fn check_cancelled(&self) -> PromptResult<()> {
        if self.cancel.is_cancelled() {
            return Err(PromptError::Cancelled);
        }
        Ok(())
    }

    /// Measures a message, charging [`IMAGE_TOKEN_COST`] per attached image.
    #[must_use]
    pub fn message_length(&self, message: &Message) -> usize {
        self.tokenizer.count(&message.text()) + message.image_count() * IMAGE_TOKEN_COST
    }

    /// Measures a list of messages.
    #[must_use]
    pub fn messages_length(&self, messages: &[Message]) -> usize {
        messages.iter().map(|message| self.message_length(message)).sum()
    }
}

/// Node of a prompt tree.
///
/// Sections are shared read-only between renders. Each render is a pure
/// function of memory, registered functions, and the budget, apart from writes
/// template functions choose to make.
#[async_trait]
pub trait PromptSection: Send + Sync {
    /// Required sections are never cut; their overflow is reported via `too_long`.
    fn required(&self) -> bool;

    /// Budget the section claims from its parent.
    fn budget(&self) -> SectionBudget;

    /// Renders the section as chat messages within `max_tokens`.
    async fn render_as_messages(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<Vec<Message>>>;

    /// Renders the section as plain text within `max_tokens`.
    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>>;
}
