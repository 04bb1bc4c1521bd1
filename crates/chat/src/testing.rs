//! Scripted backend used by the controller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use folio_llm::{
    ChatBackend, ChatHandle, ModelConfig, ProviderError, ProviderResult, ProviderStreamHandle,
    ProviderWorker, StreamRequest, make_event_stream,
};
use futures::channel::mpsc::UnboundedReceiver;
use futures::stream::{self, StreamExt};

/// How the next `stream_reply` call behaves.
pub(crate) enum Reply {
    Fragments(Vec<&'static str>),
    FailAfter(Vec<&'static str>, &'static str),
    /// `stream_reply` itself fails.
    Refuse(&'static str),
    /// The worker drops its sender without a terminal event.
    Abandon,
    /// Fragments are fed by the test through the paired sender.
    Manual(UnboundedReceiver<ProviderResult<String>>),
}

#[derive(Default)]
struct Shared {
    replies: VecDeque<Reply>,
    payloads: Vec<String>,
    handles_created: usize,
    refuse_handles: bool,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend {
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn refusing_handles() -> Self {
        let backend = Self::new();
        backend.set_refuse_handles(true);
        backend
    }

    pub(crate) fn set_refuse_handles(&self, refuse: bool) {
        self.shared.lock().unwrap().refuse_handles = refuse;
    }

    pub(crate) fn push_reply(&self, reply: Reply) {
        self.shared.lock().unwrap().replies.push_back(reply);
    }

    pub(crate) fn payloads(&self) -> Vec<String> {
        self.shared.lock().unwrap().payloads.clone()
    }

    pub(crate) fn handles_created(&self) -> usize {
        self.shared.lock().unwrap().handles_created
    }
}

impl ChatBackend for ScriptedBackend {
    fn id(&self) -> &str {
        "scripted"
    }

    fn create_handle(&self, config: &ModelConfig) -> ProviderResult<Arc<dyn ChatHandle>> {
        let mut shared = self.shared.lock().unwrap();
        if shared.refuse_handles {
            return Err(ProviderError::MissingApiKey {
                stage: "create-scripted-handle",
                provider_id: "scripted".to_string(),
            });
        }
        shared.handles_created += 1;

        Ok(Arc::new(ScriptedHandle {
            model_id: config.model_id.clone(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ScriptedHandle {
    model_id: String,
    shared: Arc<Mutex<Shared>>,
}

impl ChatHandle for ScriptedHandle {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn stream_reply(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle> {
        let reply = {
            let mut shared = self.shared.lock().unwrap();
            shared.payloads.push(request.payload.clone());
            shared
                .replies
                .pop_front()
                .unwrap_or(Reply::Fragments(Vec::new()))
        };
        let target = request.target;

        match reply {
            Reply::Fragments(fragments) => Ok(ProviderStreamHandle::from_fragments(
                target,
                stream::iter(fragments.into_iter().map(|text| Ok(text.to_string()))),
            )),
            Reply::FailAfter(fragments, message) => {
                let failure = ProviderError::FragmentStream {
                    stage: "scripted-fragment",
                    message: message.to_string(),
                };
                let fragments = stream::iter(fragments.into_iter().map(|text| Ok(text.to_string())))
                    .chain(stream::iter([Err(failure)]));
                Ok(ProviderStreamHandle::from_fragments(target, fragments))
            }
            Reply::Refuse(message) => Err(ProviderError::FragmentStream {
                stage: "scripted-open",
                message: message.to_string(),
            }),
            Reply::Abandon => {
                let (event_tx, stream, _cancel_rx) = make_event_stream();
                let worker: ProviderWorker = Box::pin(async move {
                    drop(event_tx);
                });
                Ok(ProviderStreamHandle { stream, worker })
            }
            Reply::Manual(fragments) => Ok(ProviderStreamHandle::from_fragments(target, fragments)),
        }
    }
}
