//! Prompt trees rendered into a fixed token budget.
//!
//! A prompt is a tree of [`PromptSection`]s. Leaves render text from static
//! strings, templates, memory, or conversation history; [`GroupSection`] and
//! [`Prompt`] lay out their children so that required content is always kept,
//! earlier optional siblings win over later ones, and shortened text loses whole
//! lines and sentences before individual tokens.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod functions;
mod group;
mod history;
mod layout;
mod manager;
mod prompt_template;
mod section;
mod system;
mod template;
mod text;
mod truncate;

pub use error::{PromptError, PromptResult};
pub use functions::{FunctionContext, PromptFunction, PromptFunctions};
pub use group::{GroupSection, Prompt};
pub use history::ConversationHistory;
pub use manager::{PromptManager, PromptManagerOptions};
pub use prompt_template::{
    AugmentationConfig, AugmentationType, CompletionConfig, PromptTemplate, PromptTemplateConfig,
};
pub use section::{IMAGE_TOKEN_COST, PromptSection, RenderContext, RenderedSection, SectionBudget};
pub use system::{AssistantMessage, SystemMessage, UserInputMessage, UserMessage};
pub use template::TemplateSection;
pub use text::TextSection;
pub use truncate::truncate_to_budget;
