//! Chat message model shared by prompts, models, validators, and dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Roles supported in chat-style prompts.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System messages steer the assistant behaviour.
    System,
    /// User-authored content.
    User,
    /// Assistant (model) responses.
    Assistant,
    /// Results of native action calls returned to the model.
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        })
    }
}

/// One typed part of a multi-part message.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// Text payload.
        text: String,
    },
    /// Image referenced by URL (including `data:` URLs).
    ImageUrl {
        /// Location of the image.
        image_url: String,
    },
}

/// Message body: either a single string or an ordered list of parts.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text body.
    Text(String),
    /// Ordered typed parts.
    Parts(Vec<ContentPart>),
}

/// Source cited by an assistant reply.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Citation {
    /// Cited text.
    pub content: String,
    /// Title of the cited source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Location of the cited source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Metadata attached to an assistant reply that must survive plan building.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageContext {
    /// Citations backing the reply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// Detected user intent, if the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// Function targeted by a native action call.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ActionFunction {
    /// Name of the action to invoke.
    pub name: String,
    /// JSON-encoded arguments exactly as the provider returned them.
    #[serde(default)]
    pub arguments: String,
}

/// Native structured call emitted by a provider that supports tool calling.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ActionCall {
    /// Provider-assigned call identifier.
    pub id: String,
    /// Call kind; providers currently only emit `function`.
    #[serde(rename = "type", default = "default_call_kind")]
    pub kind: String,
    /// Target function and arguments.
    pub function: ActionFunction,
}

fn default_call_kind() -> String {
    "function".to_owned()
}

impl ActionCall {
    /// Creates a function call with the supplied identifier, name, and raw arguments.
    #[must_use]
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_call_kind(),
            function: ActionFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A single chat message.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<MessageContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    action_calls: Vec<ActionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action_call_id: Option<String>,
}

impl Message {
    /// Creates a text message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(content.into())),
            context: None,
            action_calls: Vec::new(),
            action_call_id: None,
        }
    }

    /// Creates a multi-part message.
    #[must_use]
    pub fn with_parts(role: MessageRole, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Parts(parts)),
            context: None,
            action_calls: Vec::new(),
            action_call_id: None,
        }
    }

    /// Creates a message without any body (e.g. an assistant reply that only calls actions).
    #[must_use]
    pub fn empty(role: MessageRole) -> Self {
        Self {
            role,
            content: None,
            context: None,
            action_calls: Vec::new(),
            action_call_id: None,
        }
    }

    /// Shorthand for a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Shorthand for a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Shorthand for an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Attaches citation and intent metadata.
    #[must_use]
    pub fn with_context(mut self, context: MessageContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Replaces the context, keeping `None` when the source had none.
    #[must_use]
    pub fn with_optional_context(mut self, context: Option<MessageContext>) -> Self {
        self.context = context;
        self
    }

    /// Attaches native action calls.
    #[must_use]
    pub fn with_action_calls(mut self, calls: Vec<ActionCall>) -> Self {
        self.action_calls = calls;
        self
    }

    /// Marks this message as the result of the identified action call.
    #[must_use]
    pub fn with_action_call_id(mut self, id: impl Into<String>) -> Self {
        self.action_call_id = Some(id.into());
        self
    }

    /// Returns the message role.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }

    /// Returns the message body, if any.
    #[must_use]
    pub fn content(&self) -> Option<&MessageContent> {
        self.content.as_ref()
    }

    /// Returns attached citation/intent metadata.
    #[must_use]
    pub fn context(&self) -> Option<&MessageContext> {
        self.context.as_ref()
    }

    /// Returns native action calls carried by the message.
    #[must_use]
    pub fn action_calls(&self) -> &[ActionCall] {
        &self.action_calls
    }

    /// Returns the identifier of the action call this message answers.
    #[must_use]
    pub fn action_call_id(&self) -> Option<&str> {
        self.action_call_id.as_deref()
    }

    /// Returns the textual form used for token measurement and text rendering.
    ///
    /// Multi-part content contributes only its text parts, joined by a space. A
    /// message without a body but with action calls renders the calls as JSON.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            Some(MessageContent::Text(text)) => text.clone(),
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
            None if !self.action_calls.is_empty() => {
                serde_json::to_string(&self.action_calls).unwrap_or_default()
            }
            None => String::new(),
        }
    }

    /// Returns the number of image parts in the message.
    #[must_use]
    pub fn image_count(&self) -> usize {
        match &self.content {
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter(|part| matches!(part, ContentPart::ImageUrl { .. }))
                .count(),
            _ => 0,
        }
    }

    /// Returns `true` when the message has no text, images, or action calls.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.action_calls.is_empty() && self.image_count() == 0 && self.text().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parts_render_text_only() {
        let message = Message::with_parts(
            MessageRole::User,
            vec![
                ContentPart::Text {
                    text: "look at".to_owned(),
                },
                ContentPart::ImageUrl {
                    image_url: "https://example.com/cat.png".to_owned(),
                },
                ContentPart::Text {
                    text: "this".to_owned(),
                },
            ],
        );

        assert_eq!(message.text(), "look at this");
        assert_eq!(message.image_count(), 1);
    }

    #[test]
    fn action_call_only_message_renders_calls() {
        let message = Message::empty(MessageRole::Assistant)
            .with_action_calls(vec![ActionCall::function("call_1", "lights_on", "{}")]);

        assert!(message.text().contains("lights_on"));
        assert!(!message.is_empty());
    }

    #[test]
    fn serializes_wire_shape() {
        let message = Message::assistant("hi").with_context(MessageContext {
            citations: Vec::new(),
            intent: Some("greet".to_owned()),
        });
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({"role": "assistant", "content": "hi", "context": {"intent": "greet"}})
        );

        let parsed: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "a"}, {"type": "image_url", "image_url": "u"}]
        }))
        .unwrap();
        assert_eq!(parsed.image_count(), 1);
    }
}
