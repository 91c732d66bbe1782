//! Augmentations: a validator, an optional prompt section, and a plan builder.

use std::sync::Arc;

use async_trait::async_trait;
use turn_memory::Memory;
use turn_primitives::{ActionDefinition, Plan, PromptResponse, Tokenizer};
use turn_prompts::{AugmentationType, PromptSection};

use crate::error::ValidatorResult;
use crate::monologue::MonologueAugmentation;
use crate::sequence::SequenceAugmentation;
use crate::tools::ToolsAugmentation;
use crate::validation::Validation;
use crate::validator::PromptResponseValidator;

/// Strategy turning a model reply into a [`Plan`].
///
/// The planner appends [`Augmentation::create_prompt_section`] to the prompt,
/// runs the repair loop with the augmentation as its validator, and builds the
/// plan from the accepted reply.
#[async_trait]
pub trait Augmentation: PromptResponseValidator {
    /// Returns the augmentation kind.
    fn kind(&self) -> AugmentationType;

    /// Returns the instructions appended to the prompt, if any.
    fn create_prompt_section(&self) -> Option<Arc<dyn PromptSection>>;

    /// Builds the plan from a reply that passed validation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::MissingValue`](crate::ValidatorError::MissingValue)
    /// when the reply carries nothing a plan can be built from.
    async fn create_plan_from_response(
        &self,
        memory: &dyn Memory,
        response: &PromptResponse,
    ) -> ValidatorResult<Plan>;
}

/// Creates the augmentation for `kind` over the declared `actions`.
///
/// # Errors
///
/// Returns [`ValidatorError::Setup`](crate::ValidatorError::Setup) when the
/// action list cannot be rendered into prompt instructions.
pub fn create_augmentation(
    kind: AugmentationType,
    actions: &[ActionDefinition],
) -> ValidatorResult<Arc<dyn Augmentation>> {
    Ok(match kind {
        AugmentationType::None => Arc::new(DefaultAugmentation),
        AugmentationType::Monologue => Arc::new(MonologueAugmentation::new(actions)?),
        AugmentationType::Sequence => Arc::new(SequenceAugmentation::new(actions)?),
        AugmentationType::Tools => Arc::new(ToolsAugmentation::new()),
    })
}

/// Accepts any reply and says it back to the user.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAugmentation;

#[async_trait]
impl PromptResponseValidator for DefaultAugmentation {
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

#[async_trait]
impl Augmentation for DefaultAugmentation {
    fn kind(&self) -> AugmentationType {
        AugmentationType::None
    }

    fn create_prompt_section(&self) -> Option<Arc<dyn PromptSection>> {
        None
    }

    async fn create_plan_from_response(
        &self,
        _memory: &dyn Memory,
        response: &PromptResponse,
    ) -> ValidatorResult<Plan> {
        Ok(response
            .message()
            .map_or_else(Plan::default, |message| Plan::say(message.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turn_memory::TurnState;
    use turn_primitives::{Command, Message};

    #[test]
    fn factory_selects_by_kind() {
        let actions = vec![ActionDefinition::new("lights_on").unwrap()];
        for kind in [
            AugmentationType::None,
            AugmentationType::Monologue,
            AugmentationType::Sequence,
            AugmentationType::Tools,
        ] {
            let augmentation = create_augmentation(kind, &actions).unwrap();
            assert_eq!(augmentation.kind(), kind);
            let has_section = matches!(kind, AugmentationType::Monologue | AugmentationType::Sequence);
            assert_eq!(augmentation.create_prompt_section().is_some(), has_section);
        }
    }

    #[tokio::test]
    async fn default_augmentation_says_the_reply() {
        let response = PromptResponse::success(Message::assistant("hello"));
        let plan = DefaultAugmentation
            .create_plan_from_response(&TurnState::new(), &response)
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(matches!(&plan.commands()[0], Command::Say(say) if say.response.text() == "hello"));
    }
}
