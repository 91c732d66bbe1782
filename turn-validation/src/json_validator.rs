//! Validator accepting replies that contain a JSON object.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use turn_memory::Memory;
use turn_primitives::{PromptResponse, Tokenizer};

use crate::error::ValidatorResult;
use crate::response_json::parse_all_objects;
use crate::schema::{format_fixes, validate};
use crate::validation::Validation;
use crate::validator::PromptResponseValidator;

const MISSING_JSON_FEEDBACK: &str =
    "No valid JSON objects were found in the response. Return a valid JSON object.";
const ERROR_FEEDBACK: &str = "The JSON returned had errors. Apply these fixes:";

/// Accepts replies containing at least one JSON object, optionally checked
/// against a JSON Schema.
///
/// When a reply holds several objects the last one satisfying the schema wins;
/// if none does, the feedback lists the fixes for the last object found.
#[derive(Clone, Debug)]
pub struct JsonResponseValidator {
    schema: Option<Value>,
    missing_json_feedback: String,
    error_feedback: String,
}

impl Default for JsonResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonResponseValidator {
    /// Creates a validator that accepts any JSON object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: None,
            missing_json_feedback: MISSING_JSON_FEEDBACK.to_owned(),
            error_feedback: ERROR_FEEDBACK.to_owned(),
        }
    }

    /// Checks objects against `schema`.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Replaces the feedback given when no object is found.
    #[must_use]
    pub fn with_missing_json_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.missing_json_feedback = feedback.into();
        self
    }

    /// Replaces the prefix of the feedback listing schema fixes.
    #[must_use]
    pub fn with_error_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.error_feedback = feedback.into();
        self
    }

    /// Returns the schema objects are checked against.
    #[must_use]
    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    /// Validates raw reply text.
    #[must_use]
    pub fn validate_text(&self, text: &str) -> Validation {
        let mut objects = parse_all_objects(text);
        let Some(schema) = &self.schema else {
            return objects.pop().map_or_else(
                || Validation::invalid(self.missing_json_feedback.clone()),
                |object| Validation::valid_with(Value::Object(object)),
            );
        };
        if objects.is_empty() {
            return Validation::invalid(self.missing_json_feedback.clone());
        }

        let mut last_errors = Vec::new();
        for object in objects.into_iter().rev() {
            let candidate = Value::Object(object);
            let errors = validate(schema, &candidate);
            if errors.is_empty() {
                return Validation::valid_with(candidate);
            }
            if last_errors.is_empty() {
                last_errors = errors;
            }
        }
        debug!(violations = last_errors.len(), "reply failed schema validation");
        Validation::invalid(format_fixes(&self.error_feedback, &last_errors))
    }
}

#[async_trait]
impl PromptResponseValidator for JsonResponseValidator {
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
