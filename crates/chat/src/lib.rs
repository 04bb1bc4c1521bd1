//! Chat session core: transcript, prompt composition, stream ingestion and the
//! controller that ties them to a backend handle.

mod controller;
mod error;
mod ingest;
mod message;
mod prompt;
mod session;
mod settings;

#[cfg(test)]
mod testing;

pub use controller::{IgnoreReason, SessionController, SubmitOutcome};
pub use error::{ChatError, ChatResult};
pub use ingest::{IngestOutcome, STREAM_ERROR_SENTINEL, StreamIngester};
pub use message::{
    Role, StreamState, StreamTransition, StreamTransitionRejection, StreamTransitionResult,
    Transcript, Turn, TurnId, TurnStatus,
};
pub use prompt::{ComposedPrompt, PREAMBLE_SEPARATOR, PromptComposer, SYSTEM_PREAMBLE};
pub use session::ChatSession;
pub use settings::{ChatSettings, redacted};

/// Starter questions offered before the first message of a session.
pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "What are his AI specializations?",
    "Details on the Sanskrit Qwen models?",
    "Tell me about Lore Keeper and World Sim.",
    "What is his experience in AI Infrastructure?",
];
