//! Sections that combine children into one message or one text block.

use std::sync::Arc;

use async_trait::async_trait;
use turn_primitives::{Message, MessageRole};

use crate::error::PromptResult;
use crate::layout::{MessagesMode, TextMode, layout};
use crate::section::{PromptSection, RenderContext, RenderedSection, SectionBudget};

/// Lays out children as text and emits them as a single message.
pub struct GroupSection {
    sections: Vec<Arc<dyn PromptSection>>,
    role: MessageRole,
    separator: String,
    text_prefix: String,
    budget: SectionBudget,
    required: bool,
}

impl std::fmt::Debug for GroupSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupSection")
            .field("sections", &self.sections.len())
            .field("role", &self.role)
            .field("budget", &self.budget)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl GroupSection {
    /// Creates a required group with an automatic budget and `"\n\n"` separator.
    #[must_use]
    pub fn new(sections: Vec<Arc<dyn PromptSection>>, role: MessageRole) -> Self {
        Self {
            sections,
            role,
            separator: "\n\n".to_owned(),
            text_prefix: String::new(),
            budget: SectionBudget::Auto,
            required: true,
        }
    }

    /// Sets the separator placed between children.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the prefix prepended to the text form.
    #[must_use]
    pub fn with_text_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.text_prefix = prefix.into();
        self
    }

    /// Sets the token budget.
    #[must_use]
    pub fn with_budget(mut self, budget: SectionBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Marks the group optional so it may be dropped by its parent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[async_trait]
impl PromptSection for GroupSection {
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
        let rendered = layout::<TextMode>(&self.sections, ctx, max_tokens, &self.separator).await?;
        let output = if rendered.output.is_empty() {
            Vec::new()
        } else {
            vec![Message::new(self.role, rendered.output)]
        };
        Ok(RenderedSection::new(output, rendered.length, max_tokens))
    }

    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        let max_tokens = self.budget.cap(max_tokens);
        let prefix_cost = ctx.tokenizer.count(&self.text_prefix);
        let rendered = layout::<TextMode>(
            &self.sections,
            ctx,
            max_tokens.saturating_sub(prefix_cost),
            &self.separator,
        )
        .await?;
        if self.text_prefix.is_empty() || rendered.output.is_empty() {
            return Ok(RenderedSection::new(rendered.output, rendered.length, max_tokens));
        }
        let text = format!("{}{}", self.text_prefix, rendered.output);
        let length = ctx.tokenizer.count(&text);
        Ok(RenderedSection::new(text, length, max_tokens))
    }
}

/// Root section of a prompt.
///
/// The message form concatenates the children's messages; the text form joins
/// the children with a blank line.
pub struct Prompt {
    sections: Vec<Arc<dyn PromptSection>>,
    separator: String,
    budget: SectionBudget,
    required: bool,
}

impl std::fmt::Debug for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompt")
            .field("sections", &self.sections.len())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl Prompt {
    /// Creates a root over `sections`.
    #[must_use]
    pub fn new(sections: Vec<Arc<dyn PromptSection>>) -> Self {
        Self {
            sections,
            separator: "\n\n".to_owned(),
            budget: SectionBudget::Auto,
            required: true,
        }
    }

    /// Returns the child sections.
    #[must_use]
    pub fn sections(&self) -> &[Arc<dyn PromptSection>] {
        &self.sections
    }

    /// Returns a copy of this prompt with `section` appended.
    #[must_use]
    pub fn with_section(&self, section: Arc<dyn PromptSection>) -> Self {
        self.with_section_at(self.sections.len(), section)
    }

    /// Returns a copy of this prompt with `section` inserted at `index`.
    ///
    /// Indices past the end append.
    #[must_use]
    pub fn with_section_at(&self, index: usize, section: Arc<dyn PromptSection>) -> Self {
        let mut sections = self.sections.clone();
        sections.insert(index.min(sections.len()), section);
        Self {
            sections,
            separator: self.separator.clone(),
            budget: self.budget,
            required: self.required,
        }
    }

    /// Sets the separator placed between children in the text form.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the token budget used when this prompt is nested in another.
    #[must_use]
    pub fn with_budget(mut self, budget: SectionBudget) -> Self {
        self.budget = budget;
        self
    }
}

#[async_trait]
impl PromptSection for Prompt {
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
        layout::<MessagesMode>(&self.sections, ctx, self.budget.cap(max_tokens), &self.separator)
            .await
    }

    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        layout::<TextMode>(&self.sections, ctx, self.budget.cap(max_tokens), &self.separator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turn_memory::{Memory, TurnState};
    use turn_primitives::{CancellationToken, CharTokenizer, Tokenizer};

    use crate::{ConversationHistory, PromptFunctions, TemplateSection, TextSection};

    fn chat_state() -> TurnState {
        let state = TurnState::new();
        let history = vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("weather?"),
            Message::assistant("sunny"),
        ];
        state
            .set_value("conversation.history", serde_json::to_value(history).unwrap())
            .unwrap();
        state.set_value("user.name", json!("Ada")).unwrap();
        state
    }

    fn shouting_functions() -> PromptFunctions {
        let functions = PromptFunctions::new();
        functions
            .register_fn("shout", |_memory, args| Ok(json!(args.join(" ").to_uppercase())))
            .unwrap();
        functions
    }

    fn mixed_prompt() -> Prompt {
        Prompt::new(vec![
            Arc::new(TextSection::new(
                "You are a helpful assistant.",
                MessageRole::System,
            )),
            Arc::new(
                GroupSection::new(
                    vec![
                        leaf("Rules:", true),
                        leaf("Be brief. Be kind.\nNever guess.", false),
                    ],
                    MessageRole::System,
                )
                .with_separator("\n")
                .with_text_prefix("## "),
            ),
            Arc::new(ConversationHistory::new("conversation.history")),
            Arc::new(
                TextSection::new("Tip: ask follow-up questions.", MessageRole::User)
                    .optional()
                    .with_budget(SectionBudget::Fixed(10)),
            ),
            Arc::new(
                TemplateSection::new("Hello {{$user.name}}. {{shout ok}}", MessageRole::User)
                    .unwrap(),
            ),
        ])
    }

    fn leaf(text: &str, required: bool) -> Arc<dyn PromptSection> {
        let section = TextSection::new(text, MessageRole::User);
        if required {
            Arc::new(section)
        } else {
            Arc::new(section.optional())
        }
    }

    #[tokio::test]
    async fn group_drops_optional_children_before_required_ones() {
        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let group = GroupSection::new(
            vec![
                leaf("required one", true),
                leaf("optional tail that is long", false),
                leaf("required two", true),
            ],
            MessageRole::System,
        )
        .with_separator("\n");
        let rendered = group.render_as_messages(&ctx, 30).await.unwrap();
        assert_eq!(
            rendered.output,
            vec![Message::system("required one\nopti\nrequired two")]
        );
        assert_eq!(rendered.length, 30);
        assert!(!rendered.too_long);

        let rendered = group.render_as_messages(&ctx, 26).await.unwrap();
        assert_eq!(
            rendered.output,
            vec![Message::system("required one\nrequired two")]
        );
        assert_eq!(rendered.length, 25);
    }

    #[tokio::test]
    async fn text_history_fills_the_budget_net_of_separators() {
        let state = chat_state();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let prompt = Prompt::new(vec![
            Arc::new(TextSection::new("System rules.", MessageRole::System)),
            Arc::new(ConversationHistory::new("conversation.history")),
        ]);

        for budget in [44, 45] {
            let rendered = prompt.render_as_text(&ctx, budget).await.unwrap();
            assert_eq!(rendered.output, "System rules.\n\nassistant: sunny", "{budget}");
            assert_eq!(rendered.length, 31);
            assert!(!rendered.too_long);
        }

        let rendered = prompt.render_as_text(&ctx, 46).await.unwrap();
        assert_eq!(
            rendered.output,
            "System rules.\n\nuser: weather?\nassistant: sunny"
        );
        assert_eq!(rendered.length, 46);
    }

    #[tokio::test]
    async fn required_group_leaves_room_for_later_required_siblings() {
        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let prompt = Prompt::new(vec![
            Arc::new(
                GroupSection::new(
                    vec![leaf("head", true), leaf("long optional detail", false)],
                    MessageRole::System,
                )
                .with_separator("\n"),
            ),
            leaf("tail", true),
        ]);
        let rendered = prompt.render_as_text(&ctx, 15).await.unwrap();
        assert_eq!(rendered.output, "head\nlong\n\ntail");
        assert_eq!(rendered.length, 15);
        assert!(!rendered.too_long);
    }

    #[tokio::test]
    async fn mixed_tree_stays_within_every_budget() {
        let state = chat_state();
        let functions = shouting_functions();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);
        let prompt = mixed_prompt();

        let text_floor = prompt.render_as_text(&ctx, 0).await.unwrap().length;
        let messages_floor = prompt.render_as_messages(&ctx, 0).await.unwrap().length;
        assert_eq!(text_floor, 28 + 2 + 9 + 2 + 13);
        assert_eq!(messages_floor, 28 + 6 + 13);

        for budget in 0..=80 {
            let text = prompt.render_as_text(&ctx, budget).await.unwrap();
            assert_eq!(text.length, CharTokenizer.count(&text.output), "text at {budget}");
            assert_eq!(text.too_long, budget < text_floor, "text at {budget}");
            assert!(text.output.starts_with("You are a helpful assistant."));
            assert!(text.output.ends_with("Hello Ada. OK"), "text at {budget}");

            let messages = prompt.render_as_messages(&ctx, budget).await.unwrap();
            assert_eq!(
                messages.length,
                ctx.messages_length(&messages.output),
                "messages at {budget}"
            );
            assert_eq!(messages.too_long, budget < messages_floor, "messages at {budget}");
            assert_eq!(
                messages.output.last(),
                Some(&Message::user("Hello Ada. OK")),
                "messages at {budget}"
            );
        }
    }

    #[tokio::test]
    async fn rendering_is_deterministic() {
        let state = chat_state();
        let functions = shouting_functions();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);
        let prompt = mixed_prompt();

        for budget in [0, 40, 60, 75, 500] {
            let first = prompt.render_as_text(&ctx, budget).await.unwrap();
            let second = prompt.render_as_text(&ctx, budget).await.unwrap();
            assert_eq!(first, second, "text at {budget}");

            let first = prompt.render_as_messages(&ctx, budget).await.unwrap();
            let second = prompt.render_as_messages(&ctx, budget).await.unwrap();
            assert_eq!(first, second, "messages at {budget}");
        }
    }

    #[tokio::test]
    async fn prompt_text_joins_with_blank_lines() {
        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let prompt = Prompt::new(vec![leaf("first", true), leaf("second", true)]);
        let rendered = prompt.render_as_text(&ctx, 100).await.unwrap();
        assert_eq!(rendered.output, "first\n\nsecond");
        assert_eq!(rendered.length, 13);

        let messages = prompt.render_as_messages(&ctx, 100).await.unwrap();
        assert_eq!(messages.output.len(), 2);
        assert_eq!(messages.length, 11);
    }

    #[tokio::test]
    async fn with_section_at_inserts_without_mutating() {
        let prompt = Prompt::new(vec![leaf("a", true), leaf("c", true)]);
        let extended = prompt.with_section_at(1, leaf("b", true));
        assert_eq!(prompt.sections().len(), 2);
        assert_eq!(extended.sections().len(), 3);

        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);
        let rendered = extended.render_as_text(&ctx, 100).await.unwrap();
        assert_eq!(rendered.output, "a\n\nb\n\nc");
    }
}
