//! Tools augmentation: plans come from the provider's native action calls.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;
use turn_memory::Memory;
use turn_primitives::{ActionCall, Command, DoCommand, Plan, PromptResponse, Tokenizer};
use turn_prompts::{AugmentationType, PromptSection};

use crate::augmentation::Augmentation;
use crate::error::ValidatorResult;
use crate::response_json::parse_json;
use crate::validation::Validation;
use crate::validator::PromptResponseValidator;

/// Turns each native action call into a DO command.
///
/// Call structure is guaranteed by the provider, so replies are accepted as is
/// and no prompt instructions are added; the actions reach the model as tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolsAugmentation;

impl ToolsAugmentation {
    /// Creates the augmentation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn decode_arguments(call: &ActionCall) -> Map<String, Value> {
    let arguments = call.function.arguments.trim();
    if arguments.is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => map,
        _ => parse_json(arguments).unwrap_or_else(|| {
            warn!(
                action = %call.function.name,
                call_id = %call.id,
                "action call arguments are not a JSON object; using no parameters"
            );
            Map::new()
        }),
    }
}

#[async_trait]
impl PromptResponseValidator for ToolsAugmentation {
    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        _response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> ValidatorResult<Validation> {
        Ok(Validation::valid())
    }
}

#[async_trait]
impl Augmentation for ToolsAugmentation {
    fn kind(&self) -> AugmentationType {
        AugmentationType::Tools
    }

    fn create_prompt_section(&self) -> Option<Arc<dyn PromptSection>> {
        None
    }

    async fn create_plan_from_response(
        &self,
        _memory: &dyn Memory,
        response: &PromptResponse,
    ) -> ValidatorResult<Plan> {
        let Some(message) = response.message() else {
            return Ok(Plan::default());
        };
        if message.action_calls().is_empty() {
            if message.text().is_empty() {
                return Ok(Plan::default());
            }
            return Ok(Plan::say(message.clone()));
        }

        let commands = message
            .action_calls()
            .iter()
            .map(|call| {
                Command::Do(
                    DoCommand::new(call.function.name.clone(), decode_arguments(call))
                        .with_action_id(call.id.clone()),
                )
            })
            .collect();
        Ok(Plan::new(commands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turn_memory::TurnState;
    use turn_primitives::Message;

    async fn plan_for(message: Message) -> Plan {
        ToolsAugmentation::new()
            .create_plan_from_response(&TurnState::new(), &PromptResponse::success(message))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn each_call_becomes_a_do_command() {
        let message = Message::assistant("").with_action_calls(vec![
            ActionCall::function("call-1", "lights_on", r#"{"room":"hall"}"#),
            ActionCall::function("call-2", "pause", r#"{"ms": 10,"#),
            ActionCall::function("call-3", "lights_off", "not json"),
        ]);
        let plan = plan_for(message).await;
        let commands: Vec<_> = plan
            .commands()
            .iter()
            .map(|command| match command {
                Command::Do(command) => (
                    command.action.as_str(),
                    Value::Object(command.parameters.clone()),
                    command.action_id.as_deref(),
                ),
                Command::Say(_) => panic!("unexpected SAY"),
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                ("lights_on", json!({"room": "hall"}), Some("call-1")),
                ("pause", json!({"ms": 10}), Some("call-2")),
                ("lights_off", json!({}), Some("call-3")),
            ]
        );
    }

    #[tokio::test]
    async fn text_without_calls_is_said() {
        let plan = plan_for(Message::assistant("All done.")).await;
        assert_eq!(plan, Plan::say(Message::assistant("All done.")));
        assert!(plan_for(Message::assistant("")).await.is_empty());
    }
}
