//! Inner-monologue augmentation: the model thinks aloud, then picks one action.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use turn_memory::Memory;
use turn_primitives::{
    ActionDefinition, Command, DoCommand, Message, Plan, PromptResponse, SayCommand, Tokenizer,
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

/// Name of the built-in action that answers the user directly.
pub const SAY_ACTION: &str = "SAY";

const RESPONSE_FORMAT: &str = "Return a JSON object with your thoughts and the next action to perform.\n\
Only respond with the JSON format below and base your plan on the actions above.\n\
If you're not sure what to do, you can always say something by returning a SAY action.\n\
If you're told your JSON response has errors, do your best to fix them.\n\
Response Format:\n\
{\"thoughts\":{\"thought\":\"<your current thought>\",\"reasoning\":\"<self reflect on why you made this decision>\",\"plan\":\"- short bulleted\\n- list that conveys\\n- long-term plan\"},\"action\":{\"name\":\"<action name>\",\"parameters\":{\"<name>\":\"<value>\"}}}";

fn monologue_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "thoughts": {
                "type": "object",
                "properties": {
                    "thought": {"type": "string"},
                    "reasoning": {"type": "string"},
                    "plan": {"type": "string"}
                },
                "required": ["thought", "reasoning", "plan"]
            },
            "action": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "parameters": {"type": "object"}
                },
                "required": ["name"]
            }
        },
        "required": ["thoughts", "action"]
    })
}

fn say_action() -> ValidatorResult<ActionDefinition> {
    ActionDefinition::new(SAY_ACTION)
        .map(|action| {
            action
                .with_description("use to ask the user a question or say something")
                .with_parameters(json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string", "description": "text to say or question to ask"}
                    },
                    "required": ["text"]
                }))
        })
        .map_err(|err| ValidatorError::setup(err.to_string()))
}

/// Expects `{"thoughts": {..}, "action": {"name": .., "parameters": {..}}}`.
///
/// The built-in [`SAY_ACTION`] is always available in addition to the declared
/// actions. A SAY reply becomes a single SAY command, anything else a single DO.
#[derive(Debug, Clone)]
pub struct MonologueAugmentation {
    section: Arc<ActionAugmentationSection>,
    monologue: JsonResponseValidator,
    actions: ActionResponseValidator,
}

impl MonologueAugmentation {
    /// Creates the augmentation over `actions`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Setup`] when the prompt section cannot be built.
    pub fn new(actions: &[ActionDefinition]) -> ValidatorResult<Self> {
        let mut actions = actions.to_vec();
        if !actions.iter().any(|action| action.name() == SAY_ACTION) {
            actions.push(say_action()?);
        }
        Ok(Self {
            section: Arc::new(ActionAugmentationSection::new(&actions, RESPONSE_FORMAT)?),
            monologue: JsonResponseValidator::new().with_schema(monologue_schema()),
            actions: ActionResponseValidator::new(actions),
        })
    }

    /// Validates raw reply text.
    #[must_use]
    pub fn validate_text(&self, text: &str) -> Validation {
        let validation = self.monologue.validate_text(text);
        let Some(monologue) = validation.value() else {
            return validation;
        };
        let action = &monologue["action"];
        let name = action["name"].as_str().unwrap_or_default();
        let checked = self.actions.validate_action(name, action.get("parameters"));
        if checked.is_valid() {
            validation
        } else {
            checked
        }
    }
}

#[async_trait]
impl PromptResponseValidator for MonologueAugmentation {
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
impl Augmentation for MonologueAugmentation {
    fn kind(&self) -> AugmentationType {
        AugmentationType::Monologue
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
        let monologue = match response.value() {
            Some(value) => value.clone(),
            None => parse_json(&response.text())
                .map(Value::Object)
                .ok_or_else(|| ValidatorError::missing_value("reply holds no monologue object"))?,
        };
        let action = &monologue["action"];
        let name = action["name"]
            .as_str()
            .ok_or_else(|| ValidatorError::missing_value("monologue names no action"))?;
        let parameters = action["parameters"]
            .as_object()
            .cloned()
            .unwrap_or_else(Map::new);

        let command = if name == SAY_ACTION {
            let text = parameters
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let context = response
                .message()
                .and_then(|message| message.context())
                .cloned();
            Command::Say(SayCommand {
                response: Message::assistant(text).with_optional_context(context),
            })
        } else {
            Command::Do(DoCommand::new(name, parameters))
        };
        Ok(Plan::new(vec![command]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turn_memory::TurnState;
    use turn_primitives::{Citation, MessageContext};

    fn augmentation() -> MonologueAugmentation {
        MonologueAugmentation::new(&[ActionDefinition::new("lights_on")
            .unwrap()
            .with_parameters(json!({
                "type": "object",
                "properties": {"room": {"type": "string"}},
                "required": ["room"]
            }))])
        .unwrap()
    }

    fn reply(action: &Value) -> String {
        json!({
            "thoughts": {"thought": "t", "reasoning": "r", "plan": "p"},
            "action": action
        })
        .to_string()
    }

    #[test]
    fn section_lists_say_and_the_format() {
        let augmentation = augmentation();
        let text = augmentation.section.text();
        assert!(text.starts_with("actions:\n  SAY:"));
        assert!(text.contains("lights_on:"));
        assert!(text.ends_with("\"parameters\":{\"<name>\":\"<value>\"}}}"));
    }

    #[test]
    fn rejects_unknown_actions() {
        let validation = augmentation().validate_text(&reply(&json!({"name": "launch"})));
        assert!(!validation.is_valid());
        assert!(validation.feedback().unwrap().starts_with("Unknown action"));
    }

    #[test]
    fn rejects_missing_thoughts_and_bad_parameters() {
        let validation = augmentation()
            .validate_text("{\"thoughts\":{\"thought\":\"t\"},\"action\":{\"name\":\"SAY\"}}");
        assert!(validation.feedback().unwrap().contains("\"reasoning\""));

        let validation =
            augmentation().validate_text(&reply(&json!({"name": "lights_on", "parameters": {"room": 3}})));
        assert!(validation.feedback().unwrap().contains("convert \"instance.room\" to a string"));
    }

    #[tokio::test]
    async fn say_replies_become_say_commands_with_context() {
        let augmentation = augmentation();
        let text = reply(&json!({"name": "SAY", "parameters": {"text": "hi there"}}));
        let context = MessageContext {
            citations: vec![Citation {
                content: "doc".to_owned(),
                title: None,
                url: None,
            }],
            intent: Some("greet".to_owned()),
        };
        let response =
            PromptResponse::success(Message::assistant(text.clone()).with_context(context.clone()));
        assert!(augmentation.validate_text(&text).is_valid());

        let plan = augmentation
            .create_plan_from_response(&TurnState::new(), &response)
            .await
            .unwrap();
        let [Command::Say(say)] = plan.commands() else {
            panic!("expected one SAY command, got {plan:?}");
        };
        assert_eq!(say.response.text(), "hi there");
        assert_eq!(say.response.context(), Some(&context));
    }

    #[tokio::test]
    async fn other_actions_become_do_commands() {
        let augmentation = augmentation();
        let text = reply(&json!({"name": "lights_on", "parameters": {"room": "hall"}}));
        let validation = augmentation.validate_text(&text);
        let response = PromptResponse::success(Message::assistant(text))
            .with_value(validation.into_value());
        let plan = augmentation
            .create_plan_from_response(&TurnState::new(), &response)
            .await
            .unwrap();
        let [Command::Do(command)] = plan.commands() else {
            panic!("expected one DO command, got {plan:?}");
        };
        assert_eq!(command.action, "lights_on");
        assert_eq!(command.parameters["room"], json!("hall"));
    }
}
