//! Backend capability for the folio chat assistant.
//!
//! A [`ChatBackend`] creates stateful [`ChatHandle`]s; each handle streams one
//! reply per request as [`StreamEventMapped`] events tagged with the
//! [`StreamTarget`] of the submission that asked for it.

use std::sync::Arc;

mod event;
mod model;
mod provider;
mod rig_adapter;

pub use event::{SessionId, StreamEventMapped, StreamEventPayload, StreamTarget, SubmissionId};
pub use model::{DEFAULT_GEMINI_MODEL, DEFAULT_THINKING_BUDGET, ModelConfig};
pub use provider::{
    ChatBackend, ChatHandle, EVENT_CHANNEL_CAPACITY, ProviderConfig, ProviderError,
    ProviderEventStream, ProviderResult, ProviderStreamHandle, ProviderWorker, StreamRequest,
    make_event_stream,
};
pub use rig_adapter::{RIG_GEMINI_PROVIDER_ID, RigGeminiBackend, RigGeminiHandle};

pub fn create_backend(mut config: ProviderConfig) -> ProviderResult<Arc<dyn ChatBackend>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = RIG_GEMINI_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "gemini" | "google" | "rig-gemini" => {
            config.provider_id = RIG_GEMINI_PROVIDER_ID.to_string();
            Ok(Arc::new(RigGeminiBackend::new(config)))
        }
        _ => Err(ProviderError::UnsupportedProvider {
            stage: "create-backend",
            provider_id: config.provider_id,
        }),
    }
}
