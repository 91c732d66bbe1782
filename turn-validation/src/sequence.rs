//! Sequence augmentation: the model returns a whole plan of DO and SAY commands.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;
use turn_memory::Memory;
use turn_primitives::{
    ActionDefinition, Command, DoCommand, Message, MessageContext, Plan, PromptResponse,
    SayCommand, Tokenizer,
};
use turn_prompts::{AugmentationType, PromptSection};

use crate::action_section::ActionAugmentationSection;
use crate::action_validator::ActionResponseValidator;
use crate::augmentation::Augmentation;
use crate::error::{ValidatorError, ValidatorResult};
use crate::json_validator::JsonResponseValidator;
use crate::response_json::parse_json;
use crate::validation::Validation;
use crate::validator::PromptResponseValidator;

const RESPONSE_FORMAT: &str = "Use the actions above to create a plan in the following JSON format:\n\
{\"type\":\"plan\",\"commands\":[{\"type\":\"DO\",\"action\":\"<name>\",\"parameters\":{\"<name>\":<value>}},{\"type\":\"SAY\",\"response\":\"<response>\"}]}";

const SAY_FEEDBACK: &str = "Return a JSON object that uses the SAY command to say what you're thinking.";

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {"type": "string", "enum": ["plan"]},
            "commands": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"type": {"type": "string"}},
                    "required": ["type"]
                }
            }
        },
        "required": ["type", "commands"]
    })
}

/// Expects `{"type": "plan", "commands": [..]}` where each command is
/// `{"type": "DO", "action": .., "parameters": {..}}` or
/// `{"type": "SAY", "response": ..}`.
///
/// One bad command rejects the whole reply.
#[derive(Debug, Clone)]
pub struct SequenceAugmentation {
    section: Arc<ActionAugmentationSection>,
    plan: JsonResponseValidator,
    actions: ActionResponseValidator,
}

impl SequenceAugmentation {
    /// Creates the augmentation over `actions`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Setup`] when the prompt section cannot be built.
    pub fn new(actions: &[ActionDefinition]) -> ValidatorResult<Self> {
        Ok(Self {
            section: Arc::new(ActionAugmentationSection::new(actions, RESPONSE_FORMAT)?),
            plan: JsonResponseValidator::new()
                .with_schema(plan_schema())
                .with_missing_json_feedback(SAY_FEEDBACK)
                .with_error_feedback(format!(
                    "{SAY_FEEDBACK} The plan JSON had errors. Apply these fixes:"
                )),
            actions: ActionResponseValidator::new(actions.to_vec()),
        })
    }

    /// Validates raw reply text.
    #[must_use]
    pub fn validate_text(&self, text: &str) -> Validation {
        let validation = self.plan.validate_text(text);
        let Some(commands) = validation
            .value()
            .and_then(|plan| plan["commands"].as_array())
        else {
            return validation;
        };

        for (index, command) in commands.iter().enumerate() {
            match command["type"].as_str().unwrap_or_default() {
                "DO" => {
                    let name = command["action"].as_str().unwrap_or_default();
                    let checked = self.actions.validate_action(name, command.get("parameters"));
                    if !checked.is_valid() {
                        debug!(index, action = name, "plan command failed validation");
                        return checked;
                    }
                }
                "SAY" => {}
                other => {
                    return Validation::invalid(format!(
                        "Unknown command type of {other}. Only DO and SAY commands are allowed."
                    ));
                }
            }
        }
        validation
    }

    /// Builds the plan described by a validated plan object.
    ///
    /// Returns `None` when `value` is not a plan object.
    #[must_use]
    pub fn parse_plan(value: &Value, context: Option<&MessageContext>) -> Option<Plan> {
        if value["type"].as_str() != Some("plan") {
            return None;
        }
        let commands = value["commands"].as_array()?;
        let commands = commands
            .iter()
            .filter_map(|command| match command["type"].as_str()? {
                "DO" => Some(Command::Do(DoCommand::new(
                    command["action"].as_str().unwrap_or_default(),
                    command["parameters"]
                        .as_object()
                        .cloned()
                        .unwrap_or_else(Map::new),
                ))),
                "SAY" => Some(Command::Say(SayCommand {
                    response: Message::assistant(
                        command["response"].as_str().unwrap_or_default(),
                    )
                    .with_optional_context(context.cloned()),
                })),
                _ => None,
            })
            .collect();
        Some(Plan::new(commands))
    }
}

#[async_trait]
impl PromptResponseValidator for SequenceAugmentation {
    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> ValidatorResult<Validation> {
        Ok(self.validate_text(&response.text()))
    }
}

#[async_trait]
impl Augmentation for SequenceAugmentation {
    fn kind(&self) -> AugmentationType {
        AugmentationType::Sequence
    }

    fn create_prompt_section(&self) -> Option<Arc<dyn PromptSection>> {
        let section: Arc<dyn PromptSection> = self.section.clone();
        Some(section)
    }

    async fn create_plan_from_response(
        &self,
        _memory: &dyn Memory,
        response: &PromptResponse,
    ) -> ValidatorResult<Plan> {
        let value = match response.value() {
            Some(value) => value.clone(),
            None => parse_json(&response.text())
                .map(Value::Object)
                .unwrap_or_default(),
        };
        let context = response.message().and_then(Message::context);
        Self::parse_plan(&value, context)
            .ok_or_else(|| ValidatorError::missing_value("reply holds no plan object"))
    }
}
