//! Bridges a streaming [`ChatAdapter`] to [`PromptCompletionModel`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, warn};
use turn_primitives::{Message, MessageRole, PromptResponse};
use turn_prompts::{AugmentationType, PromptTemplate, RenderContext};

use crate::adapter::{AdapterError, ChatAdapter, ChatRequest};
use crate::error::{ModelError, ModelResult};
use crate::model::{PromptCompletionModel, trailing_input};

/// Completion model that renders prompts as messages and streams the reply
/// from a provider adapter.
///
/// Prompts that overflow `max_input_tokens` are not sent; they produce a
/// `too_long` response. Tools augmentation passes the template's actions to
/// the provider as native tools.
#[derive(Clone)]
pub struct AdapterModel {
    adapter: Arc<dyn ChatAdapter>,
}

impl fmt::Debug for AdapterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.adapter.metadata();
        f.debug_struct("AdapterModel")
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .finish()
    }
}

impl AdapterModel {
    /// Wraps `adapter`.
    #[must_use]
    pub fn new(adapter: Arc<dyn ChatAdapter>) -> Self {
        Self { adapter }
    }

    /// Returns the wrapped adapter.
    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn ChatAdapter> {
        &self.adapter
    }
}

#[async_trait]
impl PromptCompletionModel for AdapterModel {
    async fn complete_prompt(
        &self,
        ctx: &RenderContext<'_>,
        template: &PromptTemplate,
    ) -> ModelResult<PromptResponse> {
        ctx.check_cancelled()?;
        let completion = &template.config().completion;
        let rendered = template.render_as_messages(ctx).await?;
        if rendered.too_long {
            warn!(
                prompt = template.name(),
                length = rendered.length,
                max_input_tokens = completion.max_input_tokens,
                "rendered prompt exceeds the input budget"
            );
            return Ok(PromptResponse::too_long(format!(
                "The generated prompt length was too long ({} tokens, max {})",
                rendered.length, completion.max_input_tokens
            )));
        }

        let input = trailing_input(&rendered.output);
        let mut request = match ChatRequest::new(rendered.output) {
            Ok(request) => request.with_completion(completion),
            Err(err) => return Ok(PromptResponse::error(err.to_string())),
        };
        if template.config().augmentation.augmentation_type == AugmentationType::Tools {
            request = request.with_tools(template.actions().to_vec());
        }

        let metadata = self.adapter.metadata();
        debug!(
            provider = metadata.provider(),
            model = metadata.model(),
            prompt = template.name(),
            tokens = rendered.length,
            "sending prompt"
        );

        let mut stream = match self.adapter.infer(request).await {
            Ok(stream) => stream,
            Err(err @ AdapterError::RateLimited { .. }) => {
                return Ok(PromptResponse::rate_limited(err.to_string()).with_input(input));
            }
            Err(err) => return Ok(PromptResponse::error(err.to_string()).with_input(input)),
        };

        let mut text = String::new();
        let mut action_calls = Vec::new();
        while let Some(chunk) = stream.next().await {
            if ctx.cancel.is_cancelled() {
                return Err(ModelError::Cancelled);
            }
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => return Ok(PromptResponse::error(err.to_string()).with_input(input)),
            };
            text.push_str(&chunk.delta);
            action_calls.extend(chunk.action_calls);
            if chunk.done {
                break;
            }
        }

        let message = if text.is_empty() && !action_calls.is_empty() {
            Message::empty(MessageRole::Assistant)
        } else {
            Message::assistant(text)
        };
        Ok(PromptResponse::success(message.with_action_calls(action_calls)).with_input(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use futures::stream;
    use turn_memory::TurnState;
    use turn_primitives::{
        ActionCall, ActionDefinition, CancellationToken, CharTokenizer, PromptResponseStatus,
    };
    use turn_prompts::{
        AugmentationConfig, Prompt, PromptFunctions, PromptTemplateConfig, TextSection,
    };

    use crate::adapter::{AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk};

    struct StubAdapter {
        metadata: AdapterMetadata,
        chunks: Vec<InferenceChunk>,
        rate_limited: bool,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl StubAdapter {
        fn new(chunks: Vec<InferenceChunk>) -> Self {
            Self {
                metadata: AdapterMetadata::new("stub", "stub-1"),
                chunks,
                rate_limited: false,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatAdapter for StubAdapter {
        fn metadata(&self) -> &AdapterMetadata {
            &self.metadata
        }

        async fn infer(&self, request: ChatRequest) -> AdapterResult<AdapterStream> {
            self.requests.lock().unwrap().push(request);
            if self.rate_limited {
                return Err(AdapterError::RateLimited {
                    retry_after: Some(Duration::from_secs(1)),
                });
            }
            let chunks: Vec<AdapterResult<InferenceChunk>> =
                self.chunks.iter().cloned().map(Ok).collect();
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    fn template(max_input_tokens: usize) -> PromptTemplate {
        let mut config = PromptTemplateConfig::default();
        config.completion.max_input_tokens = max_input_tokens;
        PromptTemplate::new(
            "chat",
            Prompt::new(vec![
                Arc::new(TextSection::new("be brief", MessageRole::System)),
                Arc::new(TextSection::new("hello", MessageRole::User)),
            ]),
        )
        .with_config(config)
    }

    async fn complete(adapter: Arc<StubAdapter>, template: &PromptTemplate) -> PromptResponse {
        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);
        AdapterModel::new(adapter)
            .complete_prompt(&ctx, template)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn collects_streamed_chunks() {
        let adapter = Arc::new(StubAdapter::new(vec![
            InferenceChunk::new("Hel", false),
            InferenceChunk::new("lo!", true),
            InferenceChunk::new("ignored", true),
        ]));
        let response = complete(adapter.clone(), &template(100)).await;
        assert!(response.is_success());
        assert_eq!(response.text(), "Hello!");
        assert_eq!(response.input(), Some(&Message::user("hello")));

        let requests = adapter.requests.lock().unwrap();
        assert_eq!(requests[0].messages().len(), 2);
        assert!(requests[0].tools().is_empty());
    }

    #[tokio::test]
    async fn overflowing_prompts_are_not_sent() {
        let adapter = Arc::new(StubAdapter::new(Vec::new()));
        let response = complete(adapter.clone(), &template(5)).await;
        assert_eq!(response.status(), PromptResponseStatus::TooLong);
        assert!(adapter.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limits_become_a_status() {
        let mut stub = StubAdapter::new(Vec::new());
        stub.rate_limited = true;
        let response = complete(Arc::new(stub), &template(100)).await;
        assert_eq!(response.status(), PromptResponseStatus::RateLimited);
    }

    #[tokio::test]
    async fn tools_augmentation_sends_actions_as_tools() {
        let adapter = Arc::new(StubAdapter::new(vec![
            InferenceChunk::new("", true).with_action_calls(vec![ActionCall::function(
                "call-1",
                "lights_on",
                "{}",
            )]),
        ]));
        let mut config = template(100).config().clone();
        config.augmentation = AugmentationConfig {
            augmentation_type: AugmentationType::Tools,
        };
        let template = template(100)
            .with_config(config)
            .with_actions(vec![ActionDefinition::new("lights_on").unwrap()]);

        let response = complete(adapter.clone(), &template).await;
        let message = response.message().unwrap();
        assert_eq!(message.action_calls()[0].function.name, "lights_on");
        assert_eq!(adapter.requests.lock().unwrap()[0].tools().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_before_rendering() {
        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);
        let err = AdapterModel::new(Arc::new(StubAdapter::new(Vec::new())))
            .complete_prompt(&ctx, &template(100))
            .await
            .expect_err("cancelled");
        assert!(matches!(err, ModelError::Cancelled));
    }
}
