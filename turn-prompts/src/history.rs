//! Conversation history stored in memory, fitted newest-first.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use turn_primitives::{Message, MessageRole};

use crate::error::PromptResult;
use crate::section::{PromptSection, RenderContext, RenderedSection, SectionBudget};

/// Renders the messages stored at a memory path.
///
/// Entries are considered newest first and kept while they fit, then emitted in
/// chronological order, so the oldest entries are the ones dropped. By default
/// the section is optional and takes the whole remaining budget.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationHistory {
    variable: String,
    budget: SectionBudget,
    required: bool,
    user_prefix: String,
    assistant_prefix: String,
    separator: String,
}

impl ConversationHistory {
    /// Creates a history section reading messages from `variable`.
    #[must_use]
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            budget: SectionBudget::Share(1.0),
            required: false,
            user_prefix: "user: ".to_owned(),
            assistant_prefix: "assistant: ".to_owned(),
            separator: "\n".to_owned(),
        }
    }

    /// Sets the token budget.
    #[must_use]
    pub fn with_budget(mut self, budget: SectionBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Marks the section required; the newest entry is then always kept.
    #[must_use]
    pub fn mark_required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Overrides the prefixes used for user and assistant lines in text form.
    #[must_use]
    pub fn with_prefixes(
        mut self,
        user_prefix: impl Into<String>,
        assistant_prefix: impl Into<String>,
    ) -> Self {
        self.user_prefix = user_prefix.into();
        self.assistant_prefix = assistant_prefix.into();
        self
    }

    /// Returns the memory path the history is read from.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    fn messages(&self, ctx: &RenderContext<'_>) -> Vec<Message> {
        let Some(Value::Array(entries)) = ctx.memory.get_value(&self.variable) else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Message>(entry) {
                Ok(message) => Some(message),
                Err(err) => {
                    debug!(variable = %self.variable, %err, "skipping malformed history entry");
                    None
                }
            })
            .collect()
    }

    fn line(&self, message: &Message) -> String {
        let text = message.text();
        match message.role() {
            MessageRole::User => format!("{}{text}", self.user_prefix),
            MessageRole::Assistant => format!("{}{text}", self.assistant_prefix),
            role => format!("{role}: {text}"),
        }
    }

    fn fits(&self, kept: usize, length: usize, cost: usize, max_tokens: usize) -> bool {
        length + cost <= max_tokens || (self.required && kept == 0)
    }
}

#[async_trait]
impl PromptSection for ConversationHistory {
    fn required(&self) -> bool {
        self.required
    }

    fn budget(&self) -> SectionBudget {
        self.budget
    }

    async fn render_as_messages(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<Vec<Message>>> {
        let max_tokens = self.budget.cap(max_tokens);
        let mut kept = Vec::new();
        let mut length = 0;
        for message in self.messages(ctx).into_iter().rev() {
            let cost = ctx.message_length(&message);
            if !self.fits(kept.len(), length, cost, max_tokens) {
                break;
            }
            length += cost;
            kept.push(message);
        }
        kept.reverse();
        Ok(RenderedSection::new(kept, length, max_tokens))
    }

    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        let max_tokens = self.budget.cap(max_tokens);
        let separator_cost = ctx.tokenizer.count(&self.separator);
        let mut lines = Vec::new();
        let mut length = 0;
        for message in self.messages(ctx).iter().rev() {
            let line = self.line(message);
            let mut cost = ctx.tokenizer.count(&line);
            if !lines.is_empty() {
                cost += separator_cost;
            }
            if !self.fits(lines.len(), length, cost, max_tokens) {
                break;
            }
            length += cost;
            lines.push(line);
        }
        lines.reverse();
        Ok(RenderedSection::new(
            lines.join(&self.separator),
            length,
            max_tokens,
        ))
    }
}
