//! The validator seam used by the repair loop.

use async_trait::async_trait;
use turn_memory::Memory;
use turn_primitives::{PromptResponse, Tokenizer};

use crate::error::ValidatorResult;
use crate::validation::Validation;

/// Checks a model reply and produces feedback when it must be repaired.
///
/// Validators are stateless across calls; `remaining_attempts` only lets them
/// tailor feedback to how many repairs are left.
#[async_trait]
pub trait PromptResponseValidator: Send + Sync {
    /// Validates `response`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`](crate::ValidatorError) only when validation
    /// itself cannot run; a malformed reply yields [`Validation::invalid`].
    async fn validate_response(
        &self,
        memory: &dyn Memory,
        tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        remaining_attempts: usize,
    ) -> ValidatorResult<Validation>;
}

/// Accepts every reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResponseValidator;

#[async_trait]
impl PromptResponseValidator for DefaultResponseValidator {
    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        _response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> ValidatorResult<Validation> {
        Ok(Validation::valid())
    }
}
