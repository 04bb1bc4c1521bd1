use std::sync::Arc;

use folio_llm::{
    ChatBackend, ModelConfig, ProviderEventStream, SessionId, StreamEventMapped, StreamRequest,
    StreamTarget, SubmissionId,
};
use tokio::task::JoinHandle;

use crate::ingest::{IngestOutcome, StreamIngester};
use crate::message::{StreamState, StreamTransition, Turn};
use crate::prompt::PromptComposer;
use crate::session::ChatSession;

/// Why a submission was refused without touching the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BlankInput,
    NotInitialized,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(StreamTarget),
    Ignored(IgnoreReason),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// The in-flight submission: its ingester, event stream and backend worker.
struct ActiveStream {
    ingester: StreamIngester,
    events: ProviderEventStream,
    worker: Option<JoinHandle<()>>,
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        // The event stream signals cancel on its own drop; abort covers workers
        // that are not watching for it.
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// Owns the live session and its backend handle.
///
/// All mutation happens on the task that owns the controller; backend workers
/// only ever talk to it through the provider event channel.
pub struct SessionController {
    backend: Arc<dyn ChatBackend>,
    model: ModelConfig,
    composer: PromptComposer,
    session: ChatSession,
    input: String,
    active: Option<ActiveStream>,
    next_session_id: u64,
    next_submission_id: u64,
}

impl SessionController {
    pub fn new(backend: Arc<dyn ChatBackend>, model: ModelConfig, composer: PromptComposer) -> Self {
        Self {
            backend,
            model,
            composer,
            session: ChatSession::new(SessionId::new(1)),
            input: String::new(),
            active: None,
            next_session_id: 2,
            next_submission_id: 1,
        }
    }

    /// Acquires a fresh backend handle for the current session.
    ///
    /// Failure leaves the session disabled; it is logged, never returned.
    pub fn initialize(&mut self) -> bool {
        match self.backend.create_handle(&self.model) {
            Ok(handle) => {
                tracing::info!(
                    session_id = ?self.session.id(),
                    backend = self.backend.id(),
                    model_id = %handle.model_id(),
                    "chat session initialized"
                );
                self.session.attach_handle(handle);
                true
            }
            Err(error) => {
                tracing::error!(
                    session_id = ?self.session.id(),
                    backend = self.backend.id(),
                    error = %error,
                    "failed to initialize chat session; submission disabled"
                );
                self.session.disable();
                false
            }
        }
    }

    /// Starts a reply for `text`.
    ///
    /// Must be called from within a tokio runtime: the backend worker is
    /// spawned onto it.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return self.ignore(IgnoreReason::BlankInput);
        }
        let Some(handle) = self.session.handle().filter(|_| self.session.is_initialized()) else {
            return self.ignore(IgnoreReason::NotInitialized);
        };
        if self.is_busy() {
            return self.ignore(IgnoreReason::Busy);
        }

        let target = StreamTarget::new(self.session.id(), self.alloc_submission_id());
        if let Err(rejection) = self
            .session
            .apply_stream_transition(StreamTransition::Start(target))
        {
            tracing::debug!(target = ?target, rejection = ?rejection, "stream start rejected");
            return self.ignore(IgnoreReason::Busy);
        }

        let history = self.session.transcript().turns();
        let is_first_user_turn = PromptComposer::is_first_user_turn(history);
        let prompt = self.composer.compose(history, is_first_user_turn, text);

        let transcript = self.session.transcript_mut();
        transcript.push_user(text);
        let assistant_turn_id = transcript.push_assistant_open(target.submission_id);
        self.input.clear();

        tracing::debug!(
            target = ?target,
            includes_preamble = prompt.includes_preamble,
            payload_len = prompt.text.len(),
            "submission accepted"
        );

        let mut ingester = StreamIngester::new(target, assistant_turn_id);
        match handle.stream_reply(StreamRequest::new(target, prompt.text)) {
            Ok(stream_handle) => {
                let worker = tokio::spawn(stream_handle.worker);
                self.active = Some(ActiveStream {
                    ingester,
                    events: stream_handle.stream,
                    worker: Some(worker),
                });
            }
            Err(error) => {
                ingester.apply(
                    &mut self.session,
                    StreamEventMapped::error(target, error.to_string()),
                );
            }
        }

        SubmitOutcome::Accepted(target)
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Submits the input buffer; the buffer is cleared only on acceptance.
    pub fn submit_input(&mut self) -> SubmitOutcome {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Replaces the session with an empty one and re-initializes it.
    ///
    /// Safe mid-stream: the in-flight worker is cancelled and any event it
    /// still produces fails the stale-write guard.
    pub fn reset(&mut self) -> bool {
        if let Some(active) = self.active.take() {
            tracing::debug!(target = ?active.ingester.target(), "dropping in-flight stream on reset");
        }

        let previous_session_id = self.session.id();
        let session_id = self.alloc_session_id();
        self.session = ChatSession::new(session_id);

        tracing::info!(
            previous_session_id = ?previous_session_id,
            session_id = ?session_id,
            "chat session reset"
        );
        self.initialize()
    }

    /// Waits for the next event of the in-flight submission.
    ///
    /// Returns `None` when nothing is in flight. A channel that closes before
    /// a terminal event yields a synthesized error event. Cancel safe.
    pub async fn next_stream_event(&mut self) -> Option<StreamEventMapped> {
        let active = self.active.as_mut()?;
        let target = active.ingester.target();

        match active.events.recv().await {
            Some(event) => Some(event),
            None => Some(StreamEventMapped::error(
                target,
                "provider stream ended before a terminal event",
            )),
        }
    }

    pub fn apply_stream_event(&mut self, event: StreamEventMapped) -> IngestOutcome {
        let Some(active) = self.active.as_mut() else {
            tracing::trace!(target = ?event.target, "no stream in flight; discarding event");
            return IngestOutcome::Stale;
        };

        let outcome = active.ingester.apply(&mut self.session, event);
        if outcome.is_terminal() {
            self.active = None;
        }
        outcome
    }

    pub async fn pump(&mut self) -> Option<IngestOutcome> {
        let event = self.next_stream_event().await?;
        Some(self.apply_stream_event(event))
    }

    pub async fn run_until_idle(&mut self) {
        while let Some(outcome) = self.pump().await {
            if outcome.is_terminal() {
                break;
            }
        }
    }

    pub fn turns(&self) -> &[Turn] {
        self.session.transcript().turns()
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
            || !self.session.stream_state().is_idle()
            || self.session.transcript().open_turn().is_some()
    }

    pub fn stream_state(&self) -> &StreamState {
        self.session.stream_state()
    }

    fn ignore(&self, reason: IgnoreReason) -> SubmitOutcome {
        tracing::debug!(session_id = ?self.session.id(), reason = ?reason, "submission ignored");
        SubmitOutcome::Ignored(reason)
    }

    fn alloc_submission_id(&mut self) -> SubmissionId {
        let id = SubmissionId::new(self.next_submission_id);
        self.next_submission_id = self.next_submission_id.saturating_add(1);
        id
    }

    fn alloc_session_id(&mut self) -> SessionId {
        let id = SessionId::new(self.next_session_id);
        self.next_session_id = self.next_session_id.saturating_add(1);
        id
    }
}
