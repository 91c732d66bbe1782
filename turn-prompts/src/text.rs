//! Static text sections and the fitting rules shared by leaf sections.

use async_trait::async_trait;
use turn_primitives::{Message, MessageRole};

use crate::error::PromptResult;
use crate::section::{PromptSection, RenderContext, RenderedSection, SectionBudget};
use crate::truncate::truncate_to_budget;

/// Budget, requiredness, and text prefix shared by every leaf section.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LeafSettings {
    pub(crate) budget: SectionBudget,
    pub(crate) required: bool,
    pub(crate) text_prefix: String,
}

impl Default for LeafSettings {
    fn default() -> Self {
        Self {
            budget: SectionBudget::Auto,
            required: true,
            text_prefix: String::new(),
        }
    }
}

impl LeafSettings {
    /// Measures `text` and shortens it when the section is optional.
    pub(crate) fn fit_text(
        &self,
        ctx: &RenderContext<'_>,
        text: String,
        max_tokens: usize,
    ) -> RenderedSection<String> {
        let max_tokens = self.budget.cap(max_tokens);
        let length = ctx.tokenizer.count(&text);
        if self.required || length <= max_tokens {
            return RenderedSection::new(text, length, max_tokens);
        }
        let text = truncate_to_budget(ctx.tokenizer, &text, max_tokens);
        let length = ctx.tokenizer.count(&text);
        RenderedSection::new(text, length, max_tokens)
    }

    /// Renders the prefixed text form.
    pub(crate) fn fit_prefixed_text(
        &self,
        ctx: &RenderContext<'_>,
        text: &str,
        max_tokens: usize,
    ) -> RenderedSection<String> {
        self.fit_text(ctx, format!("{}{text}", self.text_prefix), max_tokens)
    }

    /// Renders `text` as a single message with `role`; empty text yields no message.
    pub(crate) fn fit_message(
        &self,
        ctx: &RenderContext<'_>,
        role: MessageRole,
        text: String,
        max_tokens: usize,
    ) -> RenderedSection<Vec<Message>> {
        let fitted = self.fit_text(ctx, text, max_tokens);
        let output = if fitted.output.is_empty() {
            Vec::new()
        } else {
            vec![Message::new(role, fitted.output)]
        };
        RenderedSection {
            output,
            length: fitted.length,
            too_long: fitted.too_long,
        }
    }
}

macro_rules! leaf_builders {
    ($section:ty) => {
        impl $section {
            /// Sets the token budget.
            #[must_use]
            pub fn with_budget(mut self, budget: $crate::section::SectionBudget) -> Self {
                self.settings.budget = budget;
                self
            }

            /// Marks the section optional so it may be shortened or dropped.
            #[must_use]
            pub fn optional(mut self) -> Self {
                self.settings.required = false;
                self
            }

            /// Sets the prefix prepended to the text form.
            #[must_use]
            pub fn with_text_prefix(mut self, prefix: impl Into<String>) -> Self {
                self.settings.text_prefix = prefix.into();
                self
            }
        }
    };
}
pub(crate) use leaf_builders;

/// Fixed text emitted with a role.
#[derive(Clone, Debug, PartialEq)]
pub struct TextSection {
    text: String,
    role: MessageRole,
    settings: LeafSettings,
}

impl TextSection {
    /// Creates a required section with an automatic budget.
    #[must_use]
    pub fn new(text: impl Into<String>, role: MessageRole) -> Self {
        Self {
            text: text.into(),
            role,
            settings: LeafSettings::default(),
        }
    }

    /// Returns the section text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

leaf_builders!(TextSection);

#[async_trait]
impl PromptSection for TextSection {
    fn required(&self) -> bool {
        self.settings.required
    }

    fn budget(&self) -> SectionBudget {
        self.settings.budget
    }

    async fn render_as_messages(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<Vec<Message>>> {
        Ok(self
            .settings
            .fit_message(ctx, self.role, self.text.clone(), max_tokens))
    }

    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        Ok(self.settings.fit_prefixed_text(ctx, &self.text, max_tokens))
    }
}
