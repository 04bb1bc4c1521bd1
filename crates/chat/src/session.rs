use std::fmt;
use std::sync::Arc;

use folio_llm::{ChatHandle, SessionId};

use crate::message::{StreamState, StreamTransition, StreamTransitionResult, Transcript};

/// The conversation log plus the backend handle and initialization state.
///
/// A session is never cleared in place; reset replaces it wholesale.
pub struct ChatSession {
    id: SessionId,
    transcript: Transcript,
    handle: Option<Arc<dyn ChatHandle>>,
    initialized: bool,
    stream_state: StreamState,
}

impl ChatSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            transcript: Transcript::new(),
            handle: None,
            initialized: false,
            stream_state: StreamState::Idle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn stream_state(&self) -> &StreamState {
        &self.stream_state
    }

    pub(crate) fn handle(&self) -> Option<Arc<dyn ChatHandle>> {
        self.handle.clone()
    }

    pub(crate) fn attach_handle(&mut self, handle: Arc<dyn ChatHandle>) {
        self.handle = Some(handle);
        self.initialized = true;
    }

    pub(crate) fn disable(&mut self) {
        self.handle = None;
        self.initialized = false;
    }

    /// Applies a deterministic stream transition.
    pub(crate) fn apply_stream_transition(
        &mut self,
        transition: StreamTransition,
    ) -> StreamTransitionResult {
        let next_state = self.stream_state.apply(transition)?;
        self.stream_state = next_state.clone();
        Ok(next_state)
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("turns", &self.transcript.len())
            .field(
                "handle",
                &self.handle.as_ref().map(|handle| handle.model_id().to_string()),
            )
            .field("initialized", &self.initialized)
            .field("stream_state", &self.stream_state)
            .finish()
    }
}
