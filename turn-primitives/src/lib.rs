//! Core shared types for turnkit.
//!
//! Everything that crosses a crate boundary in the render → complete → validate →
//! dispatch pipeline lives here: chat messages, plans and their commands, model
//! responses, action definitions, the tokenizer seam, and cooperative cancellation.

#![warn(missing_docs, clippy::pedantic)]

mod action;
mod cancel;
mod error;
mod message;
mod plan;
mod response;
mod tokenizer;

/// Declared actions a model may call.
pub use action::ActionDefinition;
/// Cooperative cancellation shared by render, validate, and dispatch.
pub use cancel::CancellationToken;
/// Error type and result alias shared across the SDK.
pub use error::{Error, Result};
/// Chat message model.
pub use message::{
    ActionCall, ActionFunction, Citation, ContentPart, Message, MessageContent, MessageContext,
    MessageRole,
};
/// Plans produced from validated model replies.
pub use plan::{Command, DoCommand, Plan, SayCommand};
/// Model responses handed from the completion layer to validators.
pub use response::{PromptResponse, PromptResponseStatus};
/// Token counting seam.
pub use tokenizer::{CharTokenizer, Tokenizer};
