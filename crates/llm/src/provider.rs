use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use snafu::Snafu;
use tokio::sync::{mpsc, oneshot};

use crate::event::{StreamEventMapped, StreamTarget};
use crate::model::ModelConfig;

/// Events buffered between a backend worker and its consumer.
///
/// One slot keeps the worker at most a single fragment ahead of ingestion.
pub const EVENT_CHANNEL_CAPACITY: usize = 1;

#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub api_key: String,
    pub endpoint: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub target: StreamTarget,
    pub payload: String,
}

impl StreamRequest {
    pub fn new(target: StreamTarget, payload: impl Into<String>) -> Self {
        Self {
            target,
            payload: payload.into(),
        }
    }
}

pub type ProviderWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProviderError {
    #[snafu(display("missing API key for provider '{provider_id}'"))]
    MissingApiKey {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("stream request for {target:?} has an empty payload"))]
    EmptyPayload {
        stage: &'static str,
        target: StreamTarget,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("completions failed on `{stage}`, {source}"))]
    CompletionsFailed {
        stage: &'static str,
        source: rig::completion::CompletionError,
    },
    #[snafu(display("fragment stream failed on `{stage}`: {message}"))]
    FragmentStream {
        stage: &'static str,
        message: String,
    },
}

/// Receiving half of one reply stream.
///
/// Dropping it signals cancellation to the worker that feeds it.
pub struct ProviderEventStream {
    events: mpsc::Receiver<StreamEventMapped>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

pub struct ProviderStreamHandle {
    pub stream: ProviderEventStream,
    pub worker: ProviderWorker,
}

impl ProviderEventStream {
    pub(crate) fn new(
        events: mpsc::Receiver<StreamEventMapped>,
        cancel_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            cancel_tx: Some(cancel_tx),
        }
    }

    pub async fn recv(&mut self) -> Option<StreamEventMapped> {
        self.events.recv().await
    }
}

impl Drop for ProviderEventStream {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

impl ProviderStreamHandle {
    /// Adapts any ordered, fallible fragment stream into a reply stream.
    ///
    /// The worker forwards fragments in order, emits `Done` on exhaustion and a
    /// single `Error` on the first failed item.
    pub fn from_fragments<S>(target: StreamTarget, fragments: S) -> Self
    where
        S: Stream<Item = ProviderResult<String>> + Send + 'static,
    {
        let (event_tx, stream, cancel_rx) = make_event_stream();
        let worker: ProviderWorker =
            Box::pin(forward_fragments(target, fragments, event_tx, cancel_rx));
        Self { stream, worker }
    }
}

/// Creates handles; one handle is one stateful conversation with the service.
pub trait ChatBackend: Send + Sync {
    fn id(&self) -> &str;
    fn create_handle(&self, config: &ModelConfig) -> ProviderResult<Arc<dyn ChatHandle>>;
}

/// A stateful conversation with the generative-text service.
///
/// The handle retains prior turns itself, so each request carries only the new
/// turn's payload.
pub trait ChatHandle: Send + Sync {
    fn model_id(&self) -> &str;
    fn stream_reply(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle>;
}

pub fn make_event_stream() -> (
    mpsc::Sender<StreamEventMapped>,
    ProviderEventStream,
    oneshot::Receiver<()>,
) {
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (cancel_tx, cancel_rx) = oneshot::channel();
    (
        event_tx,
        ProviderEventStream::new(event_rx, cancel_tx),
        cancel_rx,
    )
}

async fn forward_fragments<S>(
    target: StreamTarget,
    fragments: S,
    event_tx: mpsc::Sender<StreamEventMapped>,
    mut cancel_rx: oneshot::Receiver<()>,
) where
    S: Stream<Item = ProviderResult<String>> + Send + 'static,
{
    let mut fragments = Box::pin(fragments);

    loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                tracing::debug!(target = ?target, "fragment stream cancelled");
                return;
            }
            next_item = fragments.next() => {
                match next_item {
                    Some(Ok(text)) => {
                        if event_tx.send(StreamEventMapped::delta(target, text)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        tracing::warn!(
                            target = ?target,
                            error = %error,
                            "fragment stream emitted an error"
                        );
                        let _ = event_tx
                            .send(StreamEventMapped::error(target, error.to_string()))
                            .await;
                        return;
                    }
                    None => break,
                }
            }
        }
    }

    let _ = event_tx.send(StreamEventMapped::done(target)).await;
}
