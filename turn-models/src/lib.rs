//! Completion models for turnkit.
//!
//! [`PromptCompletionModel`] renders a [`PromptTemplate`](turn_prompts::PromptTemplate)
//! and returns the model's reply as a [`PromptResponse`](turn_primitives::PromptResponse).
//! Provider integrations implement the streaming [`ChatAdapter`] seam and are
//! bridged by [`AdapterModel`]; [`ScriptedModel`] replays canned replies in tests.

#![warn(missing_docs, clippy::pedantic)]

mod adapter;
mod adapter_model;
mod error;
mod model;
mod scripted;

pub use adapter::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, ChatAdapter, ChatRequest,
    InferenceChunk,
};
pub use adapter_model::AdapterModel;
pub use error::{ModelError, ModelResult};
pub use model::PromptCompletionModel;
pub use scripted::ScriptedModel;
