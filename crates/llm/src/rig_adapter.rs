use std::sync::Arc;

use futures::StreamExt;
use rig::completion::{CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use rig::streaming::{StreamedAssistantContent, StreamingCompletionResponse};
use snafu::{ResultExt, ensure};
use tokio::sync::{Mutex, mpsc, oneshot};

use super::event::StreamEventMapped;
use super::model::ModelConfig;
use super::provider::{
    ChatBackend, ChatHandle, CompletionsFailedSnafu, EmptyPayloadSnafu, HttpClientSnafu,
    MissingApiKeySnafu, ProviderConfig, ProviderError, ProviderResult, ProviderStreamHandle,
    ProviderWorker, StreamRequest, make_event_stream,
};

pub const RIG_GEMINI_PROVIDER_ID: &str = "gemini";

/// Turns the handle has already exchanged with the service.
type History = Arc<Mutex<Vec<RigMessage>>>;

pub struct RigGeminiBackend {
    config: ProviderConfig,
}

impl RigGeminiBackend {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn build_client(config: &ProviderConfig) -> ProviderResult<gemini::Client> {
        let mut builder = gemini::Client::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }
}

impl ChatBackend for RigGeminiBackend {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn create_handle(&self, config: &ModelConfig) -> ProviderResult<Arc<dyn ChatHandle>> {
        ensure!(
            !self.config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "create-handle",
                provider_id: self.config.provider_id.clone(),
            }
        );

        let client = Self::build_client(&self.config)?;
        tracing::info!(
            provider_id = %self.config.provider_id,
            model_id = %config.model_id,
            thinking_budget = config.thinking_budget,
            "created gemini chat handle"
        );

        Ok(Arc::new(RigGeminiHandle {
            client,
            config: config.clone(),
            history: Arc::new(Mutex::new(Vec::new())),
        }))
    }
}

/// One stateful Gemini conversation.
///
/// Prior turns live in `history` and are replayed on every request; a turn is
/// committed only after its reply completed without error.
pub struct RigGeminiHandle {
    client: gemini::Client,
    config: ModelConfig,
    history: History,
}

impl RigGeminiHandle {
    fn generation_params(config: &ModelConfig) -> serde_json::Value {
        serde_json::json!({
            "generationConfig": {
                "thinkingConfig": {
                    "thinkingBudget": config.thinking_budget,
                }
            }
        })
    }

    async fn open_stream<M>(
        model: &M,
        config: &ModelConfig,
        history: Vec<RigMessage>,
        payload: &str,
    ) -> ProviderResult<StreamingCompletionResponse<M::StreamingResponse>>
    where
        M: CompletionModel,
    {
        model
            .completion_request(RigMessage::user(payload.to_string()))
            .messages(history)
            .additional_params(Self::generation_params(config))
            .stream()
            .await
            .context(CompletionsFailedSnafu {
                stage: "open-stream",
            })
    }

    fn map_stream_item<R>(item: StreamedAssistantContent<R>) -> Option<String>
    where
        R: Clone + Unpin,
    {
        match item {
            StreamedAssistantContent::Text(text) => Some(text.text),
            // Thinking output is never part of the visible reply.
            StreamedAssistantContent::Reasoning(_)
            | StreamedAssistantContent::ReasoningDelta { .. }
            | StreamedAssistantContent::ToolCall { .. }
            | StreamedAssistantContent::ToolCallDelta { .. }
            | StreamedAssistantContent::Final(_) => None,
        }
    }

    async fn send_event(
        event_tx: &mpsc::Sender<StreamEventMapped>,
        event: StreamEventMapped,
    ) -> bool {
        event_tx.send(event).await.is_ok()
    }

    async fn run_stream_worker<M>(
        model: M,
        config: ModelConfig,
        history: History,
        request: StreamRequest,
        event_tx: mpsc::Sender<StreamEventMapped>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) where
        M: CompletionModel,
    {
        let target = request.target;
        let prior_turns = history.lock().await.clone();
        let prior_turn_count = prior_turns.len();

        let mut stream =
            match Self::open_stream(&model, &config, prior_turns, &request.payload).await {
                Ok(stream) => stream,
                Err(error) => {
                    tracing::error!(
                        target = ?target,
                        model_id = %config.model_id,
                        error = %error,
                        "failed to open provider stream"
                    );
                    Self::send_event(&event_tx, StreamEventMapped::error(target, error.to_string()))
                        .await;
                    return;
                }
            };

        tracing::debug!(
            target = ?target,
            prior_turn_count,
            payload_len = request.payload.len(),
            "provider stream opened"
        );

        let mut reply = String::new();

        loop {
            tokio::select! {
                _ = &mut cancel_rx => {
                    // Cancel the upstream Rig stream so provider IO stops promptly.
                    tracing::debug!(target = ?target, "provider stream cancelled");
                    stream.cancel();
                    return;
                }
                next_item = stream.next() => {
                    match next_item {
                        Some(Ok(item)) => {
                            let Some(text) = Self::map_stream_item(item) else {
                                continue;
                            };
                            reply.push_str(&text);
                            if !Self::send_event(&event_tx, StreamEventMapped::delta(target, text)).await {
                                return;
                            }
                        }
                        Some(Err(source)) => {
                            tracing::warn!(
                                target = ?target,
                                error = %source,
                                "provider stream emitted an error chunk"
                            );
                            let error = ProviderError::CompletionsFailed {
                                stage: "stream-chunk",
                                source,
                            };
                            Self::send_event(&event_tx, StreamEventMapped::error(target, error.to_string()))
                                .await;
                            return;
                        }
                        None => break,
                    }
                }
            }
        }

        {
            let mut history = history.lock().await;
            history.push(RigMessage::user(request.payload));
            history.push(RigMessage::assistant(reply));
        }

        Self::send_event(&event_tx, StreamEventMapped::done(target)).await;
    }
}

impl ChatHandle for RigGeminiHandle {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn stream_reply(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle> {
        ensure!(
            !request.payload.trim().is_empty(),
            EmptyPayloadSnafu {
                stage: "stream-reply",
                target: request.target,
            }
        );

        let model = self.client.completion_model(self.config.model_id.clone());
        let (event_tx, stream, cancel_rx) = make_event_stream();
        let worker: ProviderWorker = Box::pin(Self::run_stream_worker(
            model,
            self.config.clone(),
            self.history.clone(),
            request,
            event_tx,
            cancel_rx,
        ));

        Ok(ProviderStreamHandle { stream, worker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{SessionId, StreamTarget, SubmissionId};

    #[test]
    fn generation_params_carry_thinking_budget() {
        let params = RigGeminiHandle::generation_params(&ModelConfig::default());
        assert_eq!(
            params["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            serde_json::json!(0)
        );
    }

    #[test]
    fn missing_api_key_refuses_handle_creation() {
        let backend = RigGeminiBackend::new(ProviderConfig::new(RIG_GEMINI_PROVIDER_ID, "", ""));
        let error = match backend.create_handle(&ModelConfig::default()) {
            Ok(_) => panic!("handle must not be created without a credential"),
            Err(error) => error,
        };
        assert!(matches!(error, ProviderError::MissingApiKey { .. }));
    }

    #[test]
    fn blank_payload_is_rejected_before_any_request() {
        let backend =
            RigGeminiBackend::new(ProviderConfig::new(RIG_GEMINI_PROVIDER_ID, "test-key", ""));
        let handle = backend
            .create_handle(&ModelConfig::default())
            .expect("client builds offline");
        let target = StreamTarget::new(SessionId::new(1), SubmissionId::new(1));

        let result = handle.stream_reply(StreamRequest::new(target, "   "));
        assert!(matches!(result, Err(ProviderError::EmptyPayload { .. })));
    }
}
