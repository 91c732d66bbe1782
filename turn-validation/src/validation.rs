//! Outcome of validating a model reply.

use serde_json::Value;

/// Result of checking one reply.
///
/// Construct through [`Validation::valid`], [`Validation::valid_with`], or
/// [`Validation::invalid`]; an invalid validation never carries a value and a
/// valid one never carries feedback.
#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
    valid: bool,
    feedback: Option<String>,
    value: Option<Value>,
}

impl Validation {
    /// Accepts the reply without a structured value.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            valid: true,
            feedback: None,
            value: None,
        }
    }

    /// Accepts the reply and attaches the structured value extracted from it.
    #[must_use]
    pub fn valid_with(value: Value) -> Self {
        Self {
            valid: true,
            feedback: None,
            value: Some(value),
        }
    }

    /// Rejects the reply with feedback for the model.
    #[must_use]
    pub fn invalid(feedback: impl Into<String>) -> Self {
        Self {
            valid: false,
            feedback: Some(feedback.into()),
            value: None,
        }
    }

    /// Returns `true` when the reply was accepted.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns the feedback of a rejected reply.
    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Returns the structured value of an accepted reply.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Consumes the validation, returning its structured value.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_keep_feedback_and_value_exclusive() {
        let valid = Validation::valid_with(json!({"a": 1}));
        assert!(valid.is_valid());
        assert_eq!(valid.feedback(), None);
        assert_eq!(valid.value(), Some(&json!({"a": 1})));

        let invalid = Validation::invalid("try again");
        assert!(!invalid.is_valid());
        assert_eq!(invalid.feedback(), Some("try again"));
        assert_eq!(invalid.into_value(), None);
    }
}
