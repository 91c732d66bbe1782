//! Validator checking a predicted action call against the declared actions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use turn_memory::Memory;
use turn_primitives::{ActionDefinition, PromptResponse, Tokenizer};

use crate::error::ValidatorResult;
use crate::response_json::parse_json;
use crate::schema::{format_fixes, validate};
use crate::validation::Validation;
use crate::validator::PromptResponseValidator;

/// Checks that a reply names a declared action and that its arguments satisfy
/// the action's parameter schema.
///
/// A successful validation carries `{"name": .., "parameters": {..}}`.
#[derive(Clone, Debug, Default)]
pub struct ActionResponseValidator {
    actions: BTreeMap<String, ActionDefinition>,
}

impl ActionResponseValidator {
    /// Creates a validator over `actions`; later definitions replace earlier
    /// ones with the same name.
    #[must_use]
    pub fn new(actions: impl IntoIterator<Item = ActionDefinition>) -> Self {
        Self {
            actions: actions
                .into_iter()
                .map(|action| (action.name().to_owned(), action))
                .collect(),
        }
    }

    /// Returns the named action, if declared.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.get(name)
    }

    /// Returns the declared actions ordered by name.
    pub fn actions(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values()
    }

    /// Validates one call of `name` with the supplied arguments.
    #[must_use]
    pub fn validate_action(&self, name: &str, parameters: Option<&Value>) -> Validation {
        if name.trim().is_empty() {
            return Validation::invalid("Action name missing. Specify a valid action name.");
        }
        let Some(action) = self.actions.get(name) else {
            return Validation::invalid(format!(
                "Unknown action named \"{name}\". Specify a valid action name."
            ));
        };

        if let Some(schema) = action.parameters() {
            let Some(arguments) = parameters else {
                return Validation::invalid(format!(
                    "No arguments were sent with called action. Call the \"{name}\" action with \
                     required arguments as a valid JSON object."
                ));
            };
            let errors = validate(schema, arguments);
            if !errors.is_empty() {
                let prefix = format!(
                    "The action arguments had errors. Apply these fixes and try calling \"{name}\" again:"
                );
                return Validation::invalid(format_fixes(&prefix, &errors));
            }
        }

        let parameters = parameters
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Validation::valid_with(json!({"name": name, "parameters": parameters}))
    }
}

#[async_trait]
impl PromptResponseValidator for ActionResponseValidator {
    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> ValidatorResult<Validation> {
        if let Some(call) = response
            .message()
            .and_then(|message| message.action_calls().first())
        {
            let arguments = if call.function.arguments.trim().is_empty() {
                None
            } else {
                serde_json::from_str::<Value>(&call.function.arguments)
                    .ok()
                    .or_else(|| parse_json(&call.function.arguments).map(Value::Object))
            };
            return Ok(self.validate_action(&call.function.name, arguments.as_ref()));
        }

        let Some(object) = parse_json(&response.text()) else {
            return Ok(Validation::invalid(
                "No action was specified. Call an action with valid arguments.",
            ));
        };
        let name = object.get("name").and_then(Value::as_str).unwrap_or_default();
        Ok(self.validate_action(name, object.get("parameters")))
    }
}
