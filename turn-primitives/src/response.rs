//! Responses produced by completion models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Outcome category of a completion request.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptResponseStatus {
    /// The model replied and the reply passed validation (when validated).
    Success,
    /// The request failed in the model or transport layer.
    Error,
    /// The provider rejected the request due to rate limiting.
    RateLimited,
    /// The reply could not be repaired into a valid shape.
    InvalidResponse,
    /// The rendered prompt exceeded the input token budget.
    TooLong,
}

/// Reply from a completion model together with its status.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PromptResponse {
    status: PromptResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl PromptResponse {
    /// Creates a successful response carrying the model message.
    #[must_use]
    pub fn success(message: Message) -> Self {
        Self::with_status(PromptResponseStatus::Success, Some(message), None)
    }

    /// Creates an error response.
    #[must_use]
    pub fn error(reason: impl Into<String>) -> Self {
        Self::with_status(PromptResponseStatus::Error, None, Some(reason.into()))
    }

    /// Creates a rate-limited response.
    #[must_use]
    pub fn rate_limited(reason: impl Into<String>) -> Self {
        Self::with_status(PromptResponseStatus::RateLimited, None, Some(reason.into()))
    }

    /// Creates an invalid-response outcome carrying the last feedback.
    #[must_use]
    pub fn invalid_response(feedback: impl Into<String>) -> Self {
        Self::with_status(
            PromptResponseStatus::InvalidResponse,
            None,
            Some(feedback.into()),
        )
    }

    /// Creates a too-long outcome for prompts that exceeded their input budget.
    #[must_use]
    pub fn too_long(reason: impl Into<String>) -> Self {
        Self::with_status(PromptResponseStatus::TooLong, None, Some(reason.into()))
    }

    fn with_status(
        status: PromptResponseStatus,
        message: Option<Message>,
        error: Option<String>,
    ) -> Self {
        Self {
            status,
            input: None,
            message,
            error,
            value: None,
        }
    }

    /// Records the user input that produced this response.
    #[must_use]
    pub fn with_input(mut self, input: Option<Message>) -> Self {
        self.input = input;
        self
    }

    /// Attaches the structured value produced by a successful validation.
    #[must_use]
    pub fn with_value(mut self, value: Option<Value>) -> Self {
        self.value = value;
        self
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> PromptResponseStatus {
        self.status
    }

    /// Returns `true` for [`PromptResponseStatus::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PromptResponseStatus::Success
    }

    /// Returns the user input message, if recorded.
    #[must_use]
    pub fn input(&self) -> Option<&Message> {
        self.input.as_ref()
    }

    /// Returns the model message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Returns the textual body of the model message, or an empty string.
    #[must_use]
    pub fn text(&self) -> String {
        self.message.as_ref().map(Message::text).unwrap_or_default()
    }

    /// Returns the error or feedback text for non-success responses.
    #[must_use]
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the structured value attached by validation.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_helpers() {
        let ok = PromptResponse::success(Message::assistant("hello"))
            .with_value(Some(json!({"a": 1})));
        assert!(ok.is_success());
        assert_eq!(ok.text(), "hello");
        assert_eq!(ok.value(), Some(&json!({"a": 1})));

        let limited = PromptResponse::rate_limited("slow down");
        assert_eq!(limited.status(), PromptResponseStatus::RateLimited);
        assert_eq!(limited.error_text(), Some("slow down"));
        assert_eq!(limited.text(), "");
    }

    #[test]
    fn status_serializes_snake_case() {
        let value = serde_json::to_value(PromptResponseStatus::InvalidResponse).unwrap();
        assert_eq!(value, json!("invalid_response"));
    }
}
