//! Named prompts: a section tree plus completion settings and declared actions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use turn_primitives::{ActionDefinition, Message};

use crate::error::PromptResult;
use crate::group::Prompt;
use crate::section::{PromptSection, RenderContext, RenderedSection};

/// Completion settings sent to the model with a prompt.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    /// Model override; the completion model's default is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum tokens the model may generate.
    pub max_tokens: usize,
    /// Token budget for the rendered prompt.
    pub max_input_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Presence penalty.
    pub presence_penalty: f32,
    /// Frequency penalty.
    pub frequency_penalty: f32,
    /// Sequences that stop generation.
    pub stop_sequences: Vec<String>,
    /// Whether loaded prompts render conversation history.
    pub include_history: bool,
    /// Whether loaded prompts render the user's input.
    pub include_input: bool,
    /// Whether the user's input includes attached images.
    pub include_images: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 150,
            max_input_tokens: 2048,
            temperature: 0.0,
            top_p: 0.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stop_sequences: Vec::new(),
            include_history: true,
            include_input: true,
            include_images: false,
        }
    }
}

/// Strategy used to shape and validate model replies.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AugmentationType {
    /// Any reply is accepted and spoken back.
    #[default]
    None,
    /// Replies carry thoughts and a single action.
    Monologue,
    /// Replies carry a plan of DO and SAY commands.
    Sequence,
    /// Replies use the provider's native action calls.
    Tools,
}

/// Augmentation settings for a prompt.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AugmentationConfig {
    /// Selected augmentation.
    pub augmentation_type: AugmentationType,
}

/// Contents of a prompt's `config.json`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PromptTemplateConfig {
    /// Configuration schema version.
    pub schema: f32,
    /// Human-readable description of the prompt.
    pub description: String,
    /// Prompt kind; only `completion` is defined.
    #[serde(rename = "type")]
    pub kind: String,
    /// Completion settings.
    pub completion: CompletionConfig,
    /// Augmentation settings.
    pub augmentation: AugmentationConfig,
}

impl Default for PromptTemplateConfig {
    fn default() -> Self {
        Self {
            schema: 1.1,
            description: String::new(),
            kind: "completion".to_owned(),
            completion: CompletionConfig::default(),
            augmentation: AugmentationConfig::default(),
        }
    }
}

/// A named prompt ready to render.
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    name: String,
    prompt: Arc<Prompt>,
    config: PromptTemplateConfig,
    actions: Vec<ActionDefinition>,
}

impl PromptTemplate {
    /// Creates a template with default configuration and no actions.
    #[must_use]
    pub fn new(name: impl Into<String>, prompt: Prompt) -> Self {
        Self {
            name: name.into(),
            prompt: Arc::new(prompt),
            config: PromptTemplateConfig::default(),
            actions: Vec::new(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: PromptTemplateConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the declared actions.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<ActionDefinition>) -> Self {
        self.actions = actions;
        self
    }

    /// Returns a copy whose prompt ends with `section`.
    #[must_use]
    pub fn with_section(&self, section: Arc<dyn PromptSection>) -> Self {
        self.with_prompt(self.prompt.with_section(section))
    }

    /// Returns a copy with `section` placed right after the leading section.
    ///
    /// Augmentations use this to put their instructions next to the system
    /// prompt, ahead of history and input.
    #[must_use]
    pub fn with_instructions(&self, section: Arc<dyn PromptSection>) -> Self {
        let index = usize::from(!self.prompt.sections().is_empty());
        self.with_prompt(self.prompt.with_section_at(index, section))
    }

    /// Returns a copy with the prompt replaced.
    #[must_use]
    pub fn with_prompt(&self, prompt: Prompt) -> Self {
        Self {
            name: self.name.clone(),
            prompt: Arc::new(prompt),
            config: self.config.clone(),
            actions: self.actions.clone(),
        }
    }

    /// Returns the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the root section.
    #[must_use]
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PromptTemplateConfig {
        &self.config
    }

    /// Returns the declared actions.
    #[must_use]
    pub fn actions(&self) -> &[ActionDefinition] {
        &self.actions
    }

    /// Renders the prompt as messages within the configured input budget.
    ///
    /// # Errors
    ///
    /// Propagates template, function, memory, and cancellation failures.
    pub async fn render_as_messages(
        &self,
        ctx: &RenderContext<'_>,
    ) -> PromptResult<RenderedSection<Vec<Message>>> {
        self.prompt
            .render_as_messages(ctx, self.config.completion.max_input_tokens)
            .await
    }

    /// Renders the prompt as text within the configured input budget.
    ///
    /// # Errors
    ///
    /// Propagates template, function, memory, and cancellation failures.
    pub async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
    ) -> PromptResult<RenderedSection<String>> {
        self.prompt
            .render_as_text(ctx, self.config.completion.max_input_tokens)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turn_primitives::MessageRole;

    use crate::TextSection;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: PromptTemplateConfig = serde_json::from_value(json!({
            "schema": 1.1,
            "description": "Chat",
            "completion": {"max_input_tokens": 100, "include_history": false},
            "augmentation": {"augmentation_type": "sequence"}
        }))
        .unwrap();
        assert_eq!(config.kind, "completion");
        assert_eq!(config.completion.max_tokens, 150);
        assert_eq!(config.completion.max_input_tokens, 100);
        assert!(!config.completion.include_history);
        assert_eq!(
            config.augmentation.augmentation_type,
            AugmentationType::Sequence
        );
    }

    #[test]
    fn instructions_follow_the_leading_section() {
        let template = PromptTemplate::new(
            "chat",
            Prompt::new(vec![
                Arc::new(TextSection::new("system", MessageRole::System)),
                Arc::new(TextSection::new("input", MessageRole::User)),
            ]),
        );
        let augmented =
            template.with_instructions(Arc::new(TextSection::new("format", MessageRole::System)));
        assert_eq!(template.prompt().sections().len(), 2);
        assert_eq!(augmented.prompt().sections().len(), 3);
        assert_eq!(augmented.name(), "chat");

        let empty = PromptTemplate::new("empty", Prompt::new(Vec::new()));
        let augmented =
            empty.with_instructions(Arc::new(TextSection::new("format", MessageRole::System)));
        assert_eq!(augmented.prompt().sections().len(), 1);
    }
}
