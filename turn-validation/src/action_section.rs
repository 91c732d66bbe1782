//! System section listing the available actions and the reply format.

use async_trait::async_trait;
use serde_json::{Map, Value};
use turn_primitives::{ActionDefinition, Message, MessageRole};
use turn_prompts::{
    PromptResult, PromptSection, RenderContext, RenderedSection, SectionBudget, TextSection,
};

use crate::error::{ValidatorError, ValidatorResult};

/// Renders the declared actions as YAML followed by response format
/// instructions, as a required system message.
///
/// ```text
/// actions:
///   lights_on:
///     description: Turn on the lights
///
/// Use the actions above to create a plan ...
/// ```
#[derive(Clone, Debug)]
pub struct ActionAugmentationSection {
    inner: TextSection,
}

impl ActionAugmentationSection {
    /// Builds the section text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Setup`] when the action list cannot be
    /// rendered as YAML.
    pub fn new(actions: &[ActionDefinition], response_format: &str) -> ValidatorResult<Self> {
        let mut listed = Map::new();
        for action in actions {
            let mut entry = Map::new();
            if let Some(description) = action.description() {
                entry.insert("description".to_owned(), Value::String(description.to_owned()));
            }
            if let Some(parameters) = action.parameters() {
                entry.insert("parameters".to_owned(), parameters.clone());
            }
            listed.insert(action.name().to_owned(), Value::Object(entry));
        }
        let mut root = Map::new();
        root.insert("actions".to_owned(), Value::Object(listed));

        let yaml = serde_yaml::to_string(&Value::Object(root))
            .map_err(|err| ValidatorError::setup(format!("cannot render actions: {err}")))?;
        let text = format!("{}\n\n{response_format}", yaml.trim_end());
        Ok(Self {
            inner: TextSection::new(text, MessageRole::System),
        })
    }

    /// Returns the rendered section text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.inner.text()
    }
}

#[async_trait]
impl PromptSection for ActionAugmentationSection {
    fn required(&self) -> bool {
        self.inner.required()
    }

    fn budget(&self) -> SectionBudget {
        self.inner.budget()
    }

    async fn render_as_messages(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<Vec<Message>>> {
        self.inner.render_as_messages(ctx, max_tokens).await
    }

    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        self.inner.render_as_text(ctx, max_tokens).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lists_actions_before_the_format() {
        let actions = vec![
            ActionDefinition::new("lights_on")
                .unwrap()
                .with_description("Turn on the lights"),
            ActionDefinition::new("pause")
                .unwrap()
                .with_parameters(json!({"type": "object"})),
        ];
        let section = ActionAugmentationSection::new(&actions, "Reply with JSON.").unwrap();
        assert_eq!(
            section.text(),
            "actions:\n  lights_on:\n    description: Turn on the lights\n  pause:\n    parameters:\n      type: object\n\nReply with JSON."
        );
        assert!(section.required());
    }
}
