//! Deterministic completion model replaying canned responses.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use turn_primitives::{Message, PromptResponse};
use turn_prompts::{PromptTemplate, RenderContext};

use crate::error::ModelResult;
use crate::model::{PromptCompletionModel, trailing_input};

/// Completion model that returns queued responses in order and records every
/// rendered prompt.
///
/// Once the queue is empty each call yields an `error` response.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<PromptResponse>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("queued", &self.remaining())
            .field("calls", &self.prompts().len())
            .finish()
    }
}

impl ScriptedModel {
    /// Creates a model replaying `responses`.
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = PromptResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a model replying with successful assistant messages.
    #[must_use]
    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            replies
                .into_iter()
                .map(|reply| PromptResponse::success(Message::assistant(reply))),
        )
    }

    /// Queues another response.
    ///
    /// # Panics
    ///
    /// Panics if the internal response lock is poisoned.
    pub fn push_response(&self, response: PromptResponse) {
        self.responses
            .lock()
            .expect("scripted responses poisoned")
            .push_back(response);
    }

    /// Returns the number of queued responses.
    ///
    /// # Panics
    ///
    /// Panics if the internal response lock is poisoned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .expect("scripted responses poisoned")
            .len()
    }

    /// Returns the prompts rendered so far, one entry per call.
    ///
    /// # Panics
    ///
    /// Panics if the internal prompt lock is poisoned.
    #[must_use]
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts
            .lock()
            .expect("scripted prompts poisoned")
            .clone()
    }
}

#[async_trait]
impl PromptCompletionModel for ScriptedModel {
    async fn complete_prompt(
        &self,
        ctx: &RenderContext<'_>,
        template: &PromptTemplate,
    ) -> ModelResult<PromptResponse> {
        ctx.check_cancelled()?;
        let rendered = template.render_as_messages(ctx).await?;
        let input = trailing_input(&rendered.output);
        self.prompts
            .lock()
            .expect("scripted prompts poisoned")
            .push(rendered.output);

        let next = self
            .responses
            .lock()
            .expect("scripted responses poisoned")
            .pop_front();
        debug!(prompt = template.name(), scripted = next.is_some(), "scripted completion");
        let response = next
            .unwrap_or_else(|| PromptResponse::error("scripted model has no responses left"));
        Ok(if response.input().is_some() {
            response
        } else {
            response.with_input(input)
        })
    }
}
