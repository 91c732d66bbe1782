//! Declarations of actions a model is allowed to call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 64;

/// Describes an action: its name, purpose, and JSON Schema for its parameters.
///
/// The same definitions are rendered into prompts, passed to providers as native
/// tools, and used by validators to check predicted calls.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ActionDefinition {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

impl ActionDefinition {
    /// Creates a definition after validating the action name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidActionName`] if the name is empty, longer than 64
    /// characters, or contains characters other than ASCII letters, digits, `_`,
    /// `-`, and `.`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            description: None,
            parameters: None,
        })
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the JSON Schema describing the action parameters.
    #[must_use]
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = Some(schema);
        self
    }

    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the parameter schema, if declared.
    #[must_use]
    pub fn parameters(&self) -> Option<&Value> {
        self.parameters.as_ref()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("action name cannot be empty".to_owned())
    } else if name.len() > MAX_NAME_LEN {
        Some(format!("action name length must be <= {MAX_NAME_LEN}"))
    } else if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
    {
        Some("action name may only contain ASCII letters, digits, `_`, `-`, and `.`".to_owned())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidActionName {
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_definition() {
        let action = ActionDefinition::new("lights_on")
            .unwrap()
            .with_description("Turns on the lights")
            .with_parameters(json!({"type": "object"}));

        assert_eq!(action.name(), "lights_on");
        assert_eq!(action.description(), Some("Turns on the lights"));
        assert!(action.parameters().is_some());
    }

    #[test]
    fn rejects_invalid_names() {
        for name in ["", "  ", "has space", "semi;colon"] {
            let err = ActionDefinition::new(name).expect_err("name should be rejected");
            assert!(matches!(err, Error::InvalidActionName { .. }));
        }
        assert!(ActionDefinition::new("x".repeat(65)).is_err());
    }
}
