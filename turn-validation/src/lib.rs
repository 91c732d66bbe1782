//! Turning free-form model replies into validated plans.
//!
//! [`parse_json`] recovers JSON objects from noisy text, the
//! [`PromptResponseValidator`] implementations check replies and produce
//! feedback for repairs, and the [`Augmentation`]s pair a validator with the
//! prompt instructions it expects and the plan builder for accepted replies.

#![warn(missing_docs, clippy::pedantic)]

mod action_section;
mod action_validator;
mod augmentation;
mod error;
mod json_validator;
mod monologue;
mod response_json;
mod schema;
mod sequence;
mod tools;
mod validation;
mod validator;

pub use action_section::ActionAugmentationSection;
pub use action_validator::ActionResponseValidator;
pub use augmentation::{Augmentation, DefaultAugmentation, create_augmentation};
pub use error::{ValidatorError, ValidatorResult};
pub use json_validator::JsonResponseValidator;
pub use monologue::{MonologueAugmentation, SAY_ACTION};
pub use response_json::{parse_all_objects, parse_json};
pub use schema::{SchemaError, SchemaViolation, format_fixes, validate as validate_schema};
pub use sequence::SequenceAugmentation;
pub use tools::ToolsAugmentation;
pub use validation::Validation;
pub use validator::{DefaultResponseValidator, PromptResponseValidator};
