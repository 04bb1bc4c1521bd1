use folio_llm::{StreamEventMapped, StreamEventPayload, StreamTarget};

use crate::message::{StreamTransition, TurnId, TurnStatus};
use crate::session::ChatSession;

/// User-visible text that replaces an assistant turn whose stream failed.
pub const STREAM_ERROR_SENTINEL: &str = "SYSTEM ERROR. CONNECTION TERMINATED.";

/// What one provider event did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The open turn now holds the accumulated prefix of the reply.
    Updated { turn_id: TurnId },
    /// Empty fragment; nothing changed.
    Unchanged,
    Closed { turn_id: TurnId },
    Errored { turn_id: TurnId },
    /// The event belongs to a submission or session that is no longer current.
    Stale,
}

impl IngestOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Errored { .. })
    }
}

/// Folds the fragments of one submission into its open assistant turn.
#[derive(Debug)]
pub struct StreamIngester {
    target: StreamTarget,
    turn_id: TurnId,
    accumulated: String,
    fragment_count: usize,
}

impl StreamIngester {
    pub fn new(target: StreamTarget, turn_id: TurnId) -> Self {
        Self {
            target,
            turn_id,
            accumulated: String::new(),
            fragment_count: 0,
        }
    }

    pub fn target(&self) -> StreamTarget {
        self.target
    }

    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    /// Applies one event, or discards it when the guard finds it stale.
    pub fn apply(&mut self, session: &mut ChatSession, event: StreamEventMapped) -> IngestOutcome {
        if !self.is_current(session, event.target) {
            tracing::trace!(
                target = ?event.target,
                expected = ?self.target,
                "discarding stale stream event"
            );
            return IngestOutcome::Stale;
        }

        match event.payload {
            StreamEventPayload::Delta(fragment) => self.apply_fragment(session, &fragment),
            StreamEventPayload::Done => self.close(session),
            StreamEventPayload::Error(message) => self.fail(session, message),
        }
    }

    fn is_current(&self, session: &ChatSession, target: StreamTarget) -> bool {
        target == self.target
            && session.id() == target.session_id
            && session.stream_state().accepts_stream_event(target)
            && session
                .transcript()
                .open_turn()
                .is_some_and(|turn| turn.id == self.turn_id)
    }

    /// Moves the session's stream state; a rejection leaves it untouched.
    fn advance(&self, session: &mut ChatSession, transition: StreamTransition) -> bool {
        match session.apply_stream_transition(transition) {
            Ok(_) => true,
            Err(rejection) => {
                tracing::error!(
                    target = ?self.target,
                    state = ?session.stream_state(),
                    rejection = ?rejection,
                    "stream transition rejected"
                );
                false
            }
        }
    }

    fn apply_fragment(&mut self, session: &mut ChatSession, fragment: &str) -> IngestOutcome {
        if fragment.is_empty() {
            return IngestOutcome::Unchanged;
        }

        self.accumulated.push_str(fragment);
        self.fragment_count += 1;

        let Some(turn) = session.transcript_mut().get_mut(self.turn_id) else {
            return IngestOutcome::Stale;
        };
        // Reassign the whole prefix so readers never observe a partial append.
        turn.text.clone_from(&self.accumulated);

        self.advance(session, StreamTransition::FragmentApplied(self.target));
        IngestOutcome::Updated {
            turn_id: self.turn_id,
        }
    }

    fn close(&mut self, session: &mut ChatSession) -> IngestOutcome {
        if let Some(turn) = session.transcript_mut().get_mut(self.turn_id) {
            turn.status = TurnStatus::Closed;
        }
        self.advance(session, StreamTransition::Complete(self.target));

        tracing::info!(
            target = ?self.target,
            fragment_count = self.fragment_count,
            reply_len = self.accumulated.len(),
            "assistant turn closed"
        );
        IngestOutcome::Closed {
            turn_id: self.turn_id,
        }
    }

    fn fail(&mut self, session: &mut ChatSession, message: String) -> IngestOutcome {
        tracing::warn!(
            target = ?self.target,
            fragment_count = self.fragment_count,
            error = %message,
            "assistant stream failed; replacing partial reply with sentinel"
        );

        self.accumulated.clear();
        if let Some(turn) = session.transcript_mut().get_mut(self.turn_id) {
            turn.text = STREAM_ERROR_SENTINEL.to_string();
            turn.status = TurnStatus::Errored;
        }
        self.advance(
            session,
            StreamTransition::Fail {
                target: self.target,
                message,
            },
        );

        IngestOutcome::Errored {
            turn_id: self.turn_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use folio_llm::{SessionId, SubmissionId};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::StreamState;

    fn start(session: &mut ChatSession, submission: u64) -> StreamIngester {
        let target = StreamTarget::new(session.id(), SubmissionId::new(submission));
        session.transcript_mut().push_user("question");
        let turn_id = session
            .transcript_mut()
            .push_assistant_open(target.submission_id);
        session
            .apply_stream_transition(StreamTransition::Start(target))
            .unwrap();
        StreamIngester::new(target, turn_id)
    }

    fn open_text(session: &ChatSession) -> String {
        session.transcript().last().map(|turn| turn.text.clone()).unwrap_or_default()
    }

    #[test]
    fn fragments_concatenate_and_every_read_is_a_prefix() {
        let mut session = ChatSession::new(SessionId::new(1));
        let mut ingester = start(&mut session, 1);
        let target = ingester.target();
        let fragments = ["NLP", ", Computer Vision, LLM", " fine-tuning."];
        let final_text = fragments.concat();

        for fragment in fragments {
            let outcome = ingester.apply(&mut session, StreamEventMapped::delta(target, fragment));
            assert_eq!(outcome, IngestOutcome::Updated { turn_id: ingester.turn_id() });
            assert!(final_text.starts_with(&open_text(&session)));
        }
        let outcome = ingester.apply(&mut session, StreamEventMapped::done(target));

        assert!(outcome.is_terminal());
        assert_eq!(open_text(&session), "NLP, Computer Vision, LLM fine-tuning.");
        assert_eq!(session.stream_state(), &StreamState::Closed(target));
        assert!(session.transcript().open_turn().is_none());
    }

    #[test]
    fn error_replaces_partial_output_with_sentinel() {
        let mut session = ChatSession::new(SessionId::new(1));
        let mut ingester = start(&mut session, 1);
        let target = ingester.target();

        ingester.apply(&mut session, StreamEventMapped::delta(target, "Hel"));
        ingester.apply(&mut session, StreamEventMapped::delta(target, "lo"));
        let outcome = ingester.apply(&mut session, StreamEventMapped::error(target, "reset"));

        assert_eq!(outcome, IngestOutcome::Errored { turn_id: ingester.turn_id() });
        let turn = session.transcript().last().unwrap();
        assert_eq!(turn.text, STREAM_ERROR_SENTINEL);
        assert_eq!(turn.status, TurnStatus::Errored);
        assert!(session.stream_state().is_idle());
    }

    #[test]
    fn empty_fragment_is_a_noop_and_keeps_sending_state() {
        let mut session = ChatSession::new(SessionId::new(1));
        let mut ingester = start(&mut session, 1);
        let target = ingester.target();

        let outcome = ingester.apply(&mut session, StreamEventMapped::delta(target, ""));
        assert_eq!(outcome, IngestOutcome::Unchanged);
        assert_eq!(session.stream_state(), &StreamState::Sending(target));
    }

    #[test]
    fn zero_fragments_close_with_empty_text() {
        let mut session = ChatSession::new(SessionId::new(1));
        let mut ingester = start(&mut session, 1);
        let target = ingester.target();

        ingester.apply(&mut session, StreamEventMapped::done(target));
        let turn = session.transcript().last().unwrap();
        assert_eq!(turn.text, "");
        assert_eq!(turn.status, TurnStatus::Closed);
    }

    #[test]
    fn events_for_other_targets_are_stale() {
        let mut session = ChatSession::new(SessionId::new(2));
        let mut ingester = start(&mut session, 1);
        let old_session = StreamTarget::new(SessionId::new(1), SubmissionId::new(1));
        let old_submission = StreamTarget::new(SessionId::new(2), SubmissionId::new(0));

        for target in [old_session, old_submission] {
            let outcome = ingester.apply(&mut session, StreamEventMapped::delta(target, "late"));
            assert_eq!(outcome, IngestOutcome::Stale);
        }
        assert_eq!(open_text(&session), "");
    }

    #[test]
    fn events_after_close_are_stale() {
        let mut session = ChatSession::new(SessionId::new(1));
        let mut ingester = start(&mut session, 1);
        let target = ingester.target();

        ingester.apply(&mut session, StreamEventMapped::delta(target, "done"));
        ingester.apply(&mut session, StreamEventMapped::done(target));
        let outcome = ingester.apply(&mut session, StreamEventMapped::delta(target, " extra"));

        assert_eq!(outcome, IngestOutcome::Stale);
        assert_eq!(open_text(&session), "done");
    }

    #[test]
    fn rejected_transition_leaves_state_untouched() {
        let mut session = ChatSession::new(SessionId::new(1));
        let target = StreamTarget::new(session.id(), SubmissionId::new(4));
        let turn_id = session.transcript_mut().push_assistant_open(target.submission_id);
        let ingester = StreamIngester::new(target, turn_id);

        assert!(!ingester.advance(&mut session, StreamTransition::Complete(target)));
        assert_eq!(session.stream_state(), &StreamState::Idle);

        assert!(ingester.advance(&mut session, StreamTransition::Start(target)));
        assert_eq!(session.stream_state(), &StreamState::Sending(target));
    }
}
