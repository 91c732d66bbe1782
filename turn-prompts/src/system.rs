//! Role-specific template sections and the user input section.

use async_trait::async_trait;
use serde_json::Value;
use turn_primitives::{ContentPart, Message, MessageRole};

use crate::error::PromptResult;
use crate::section::{
    IMAGE_TOKEN_COST, PromptSection, RenderContext, RenderedSection, SectionBudget,
};
use crate::template::{TemplateSection, value_to_text};
use crate::text::{LeafSettings, leaf_builders};

macro_rules! role_section {
    ($name:ident, $role:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name(TemplateSection);

        impl $name {
            /// Parses the template.
            ///
            /// # Errors
            ///
            /// Returns [`PromptError::InvalidTemplate`](crate::PromptError::InvalidTemplate)
            /// when the template is malformed.
            pub fn new(template: impl Into<String>) -> PromptResult<Self> {
                TemplateSection::new(template, $role).map(Self)
            }

            /// Sets the token budget.
            #[must_use]
            pub fn with_budget(self, budget: SectionBudget) -> Self {
                Self(self.0.with_budget(budget))
            }

            /// Marks the section optional so it may be shortened or dropped.
            #[must_use]
            pub fn optional(self) -> Self {
                Self(self.0.optional())
            }

            /// Sets the prefix prepended to the text form.
            #[must_use]
            pub fn with_text_prefix(self, prefix: impl Into<String>) -> Self {
                Self(self.0.with_text_prefix(prefix))
            }

            /// Returns the underlying template section.
            #[must_use]
            pub fn template(&self) -> &TemplateSection {
                &self.0
            }
        }

        #[async_trait]
        impl PromptSection for $name {
            fn required(&self) -> bool {
                self.0.required()
            }

            fn budget(&self) -> SectionBudget {
                self.0.budget()
            }

            async fn render_as_messages(
                &self,
                ctx: &RenderContext<'_>,
                max_tokens: usize,
            ) -> PromptResult<RenderedSection<Vec<Message>>> {
                self.0.render_as_messages(ctx, max_tokens).await
            }

            async fn render_as_text(
                &self,
                ctx: &RenderContext<'_>,
                max_tokens: usize,
            ) -> PromptResult<RenderedSection<String>> {
                self.0.render_as_text(ctx, max_tokens).await
            }
        }
    };
}

role_section!(
    SystemMessage,
    MessageRole::System,
    "Template rendered as a system message."
);
role_section!(
    UserMessage,
    MessageRole::User,
    "Template rendered as a user message."
);
role_section!(
    AssistantMessage,
    MessageRole::Assistant,
    "Template rendered as an assistant message."
);

/// Renders the user's input and attached images from memory.
///
/// Text comes from `temp.input` and images from `temp.inputFiles`. Each file is
/// either a URL string, an object with a `url`, or an object with an `image/*`
/// `content_type` and base64 `content`. Images cost a fixed number of tokens
/// ([`IMAGE_TOKEN_COST`]); an optional section keeps only the images that fit.
#[derive(Clone, Debug, PartialEq)]
pub struct UserInputMessage {
    input_variable: String,
    files_variable: String,
    settings: LeafSettings,
}

impl Default for UserInputMessage {
    fn default() -> Self {
        Self {
            input_variable: "temp.input".to_owned(),
            files_variable: "temp.inputFiles".to_owned(),
            settings: LeafSettings::default(),
        }
    }
}

impl UserInputMessage {
    /// Creates a section reading `temp.input` and `temp.inputFiles`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the input text from another memory path.
    #[must_use]
    pub fn with_input_variable(mut self, path: impl Into<String>) -> Self {
        self.input_variable = path.into();
        self
    }

    /// Reads attached files from another memory path.
    #[must_use]
    pub fn with_files_variable(mut self, path: impl Into<String>) -> Self {
        self.files_variable = path.into();
        self
    }

    fn input_text(&self, ctx: &RenderContext<'_>) -> String {
        value_to_text(ctx.memory.get_value(&self.input_variable).as_ref())
    }

    fn image_urls(&self, ctx: &RenderContext<'_>) -> Vec<String> {
        let Some(Value::Array(files)) = ctx.memory.get_value(&self.files_variable) else {
            return Vec::new();
        };
        files.iter().filter_map(image_url).collect()
    }
}

leaf_builders!(UserInputMessage);

fn image_url(file: &Value) -> Option<String> {
    match file {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => {
            if let Some(url) = map.get("url").and_then(Value::as_str) {
                return Some(url.to_owned());
            }
            let content_type = map.get("content_type").and_then(Value::as_str)?;
            if !content_type.starts_with("image/") {
                return None;
            }
            let content = map.get("content").and_then(Value::as_str)?;
            Some(format!("data:{content_type};base64,{content}"))
        }
        _ => None,
    }
}

#[async_trait]
impl PromptSection for UserInputMessage {
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
        let max_tokens = self.settings.budget.cap(max_tokens);
        let text = self.settings.fit_text(ctx, self.input_text(ctx), max_tokens);
        let mut length = text.length;

        let mut images = Vec::new();
        for url in self.image_urls(ctx) {
            if !self.settings.required && length + IMAGE_TOKEN_COST > max_tokens {
                break;
            }
            length += IMAGE_TOKEN_COST;
            images.push(ContentPart::ImageUrl { image_url: url });
        }

        let output = if images.is_empty() {
            if text.output.is_empty() {
                Vec::new()
            } else {
                vec![Message::user(text.output)]
            }
        } else {
            let mut parts = Vec::with_capacity(images.len() + 1);
            if !text.output.is_empty() {
                parts.push(ContentPart::Text { text: text.output });
            }
            parts.extend(images);
            vec![Message::with_parts(MessageRole::User, parts)]
        };
        Ok(RenderedSection::new(output, length, max_tokens))
    }

    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        Ok(self
            .settings
            .fit_prefixed_text(ctx, &self.input_text(ctx), max_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turn_memory::{Memory, TurnState};
    use turn_primitives::{CancellationToken, CharTokenizer};

    use crate::PromptFunctions;

    #[tokio::test]
    async fn role_sections_render_with_their_role() {
        let state = TurnState::new();
        state.set_value("temp.topic", json!("tides")).unwrap();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let system = SystemMessage::new("Talk about {{$topic}}.").unwrap();
        let assistant = AssistantMessage::new("Sure.").unwrap();
        let rendered = system.render_as_messages(&ctx, 100).await.unwrap();
        assert_eq!(rendered.output, vec![Message::system("Talk about tides.")]);
        let rendered = assistant.render_as_messages(&ctx, 100).await.unwrap();
        assert_eq!(rendered.output[0].role(), MessageRole::Assistant);
    }

    #[tokio::test]
    async fn user_input_includes_images() {
        let state = TurnState::new();
        state.set_value("temp.input", json!("what is this?")).unwrap();
        state
            .set_value(
                "temp.inputFiles",
                json!([
                    "https://example.com/cat.png",
                    {"content_type": "image/png", "content": "iVBOR"},
                    {"content_type": "text/plain", "content": "ignored"}
                ]),
            )
            .unwrap();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let rendered = UserInputMessage::new()
            .render_as_messages(&ctx, 1_000)
            .await
            .unwrap();
        let message = &rendered.output[0];
        assert_eq!(message.image_count(), 2);
        assert_eq!(message.text(), "what is this?");
        assert_eq!(rendered.length, 13 + 2 * IMAGE_TOKEN_COST);

        let optional = UserInputMessage::new()
            .optional()
            .render_as_messages(&ctx, 100)
            .await
            .unwrap();
        assert_eq!(optional.output[0].image_count(), 1);
        assert!(!optional.too_long);
    }

    #[tokio::test]
    async fn missing_input_renders_nothing() {
        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let rendered = UserInputMessage::new()
            .render_as_messages(&ctx, 100)
            .await
            .unwrap();
        assert!(rendered.output.is_empty());
        assert_eq!(rendered.length, 0);
    }
}
