use folio_llm::{StreamTarget, SubmissionId};

/// Stable identifier for one turn within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl TurnId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle status for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// Assistant turn still receiving fragments for the given submission.
    Open(SubmissionId),
    Closed,
    Errored,
}

/// One message in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub status: TurnStatus,
}

impl Turn {
    pub fn new(id: TurnId, role: Role, text: impl Into<String>, status: TurnStatus) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            status,
        }
    }

    pub fn user(id: TurnId, text: impl Into<String>) -> Self {
        Self::new(id, Role::User, text, TurnStatus::Closed)
    }

    /// Creates the empty assistant placeholder a submission streams into.
    pub fn assistant_open(id: TurnId, submission_id: SubmissionId) -> Self {
        Self::new(
            id,
            Role::Assistant,
            String::new(),
            TurnStatus::Open(submission_id),
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, TurnStatus::Open(_))
    }
}

/// Ordered, append-only log of turns for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
    next_turn_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> TurnId {
        let id = self.alloc_turn_id();
        self.turns.push(Turn::user(id, text));
        id
    }

    pub fn push_assistant_open(&mut self, submission_id: SubmissionId) -> TurnId {
        let id = self.alloc_turn_id();
        self.turns.push(Turn::assistant_open(id, submission_id));
        id
    }

    /// Returns the single assistant turn still receiving fragments, if any.
    pub fn open_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| turn.is_open())
    }

    pub fn get_mut(&mut self, id: TurnId) -> Option<&mut Turn> {
        // Open turns are always at the tail; search from the back.
        self.turns.iter_mut().rev().find(|turn| turn.id == id)
    }

    fn alloc_turn_id(&mut self) -> TurnId {
        self.next_turn_id = self.next_turn_id.saturating_add(1);
        TurnId::new(self.next_turn_id)
    }
}

/// Per-submission stream lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    /// Request issued, no fragment applied yet.
    Sending(StreamTarget),
    /// At least one fragment applied.
    Streaming(StreamTarget),
    Closed(StreamTarget),
    Errored {
        target: StreamTarget,
        message: String,
    },
}

/// State transition input for stream lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTransition {
    Start(StreamTarget),
    FragmentApplied(StreamTarget),
    Complete(StreamTarget),
    Fail {
        target: StreamTarget,
        message: String,
    },
}

/// Rejection reason for illegal stream transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTransitionRejection {
    AlreadyStreaming {
        active: StreamTarget,
        attempted: StreamTarget,
    },
    NoActiveStream,
    SessionMismatch {
        active: StreamTarget,
        attempted: StreamTarget,
    },
}

pub type StreamTransitionResult = Result<StreamState, StreamTransitionRejection>;

impl StreamState {
    /// Returns the in-flight target while `Sending` or `Streaming`.
    pub fn active_target(&self) -> Option<StreamTarget> {
        match self {
            Self::Sending(target) | Self::Streaming(target) => Some(*target),
            Self::Idle | Self::Closed(_) | Self::Errored { .. } => None,
        }
    }

    /// Terminal states hand control back to the user just like `Idle`.
    pub fn is_idle(&self) -> bool {
        self.active_target().is_none()
    }

    /// Returns true when incoming stream data matches the in-flight submission.
    pub fn accepts_stream_event(&self, target: StreamTarget) -> bool {
        self.active_target() == Some(target)
    }

    /// Applies one transition deterministically.
    ///
    /// Idle and terminal states may start a new submission. Every other
    /// transition must name the in-flight target exactly.
    pub fn apply(&self, transition: StreamTransition) -> StreamTransitionResult {
        match transition {
            StreamTransition::Start(target) => self.apply_start(target),
            StreamTransition::FragmentApplied(target) => {
                self.apply_active(target, || Self::Streaming(target))
            }
            StreamTransition::Complete(target) => self.apply_active(target, || Self::Closed(target)),
            StreamTransition::Fail { target, message } => {
                self.apply_active(target, || Self::Errored { target, message })
            }
        }
    }

    fn apply_start(&self, target: StreamTarget) -> StreamTransitionResult {
        match self.active_target() {
            Some(active) if active == target => Ok(self.clone()),
            Some(active) => Err(StreamTransitionRejection::AlreadyStreaming {
                active,
                attempted: target,
            }),
            None => Ok(Self::Sending(target)),
        }
    }

    fn apply_active(
        &self,
        target: StreamTarget,
        next: impl FnOnce() -> StreamState,
    ) -> StreamTransitionResult {
        match self.active_target() {
            Some(active) if active == target => Ok(next()),
            Some(active) => Err(StreamTransitionRejection::SessionMismatch {
                active,
                attempted: target,
            }),
            None => Err(StreamTransitionRejection::NoActiveStream),
        }
    }
}

#[cfg(test)]
mod tests {
    use folio_llm::SessionId;
    use pretty_assertions::assert_eq;

    use super::*;

    fn target(submission: u64) -> StreamTarget {
        StreamTarget::new(SessionId::new(1), SubmissionId::new(submission))
    }

    #[test]
    fn submission_walks_sending_streaming_closed() {
        let state = StreamState::Idle;
        let state = state.apply(StreamTransition::Start(target(1))).unwrap();
        assert_eq!(state, StreamState::Sending(target(1)));

        let state = state
            .apply(StreamTransition::FragmentApplied(target(1)))
            .unwrap();
        assert_eq!(state, StreamState::Streaming(target(1)));

        let state = state.apply(StreamTransition::Complete(target(1))).unwrap();
        assert_eq!(state, StreamState::Closed(target(1)));
        assert!(state.is_idle());
    }

    #[test]
    fn failure_is_terminal_and_idle() {
        let state = StreamState::Sending(target(1))
            .apply(StreamTransition::Fail {
                target: target(1),
                message: "boom".into(),
            })
            .unwrap();
        assert!(state.is_idle());
        assert!(!state.accepts_stream_event(target(1)));
    }

    #[test]
    fn second_start_is_rejected_while_in_flight() {
        let state = StreamState::Sending(target(1));
        assert_eq!(
            state.apply(StreamTransition::Start(target(2))),
            Err(StreamTransitionRejection::AlreadyStreaming {
                active: target(1),
                attempted: target(2),
            })
        );
    }

    #[test]
    fn events_for_another_submission_are_mismatched() {
        let state = StreamState::Streaming(target(2));
        assert_eq!(
            state.apply(StreamTransition::Complete(target(1))),
            Err(StreamTransitionRejection::SessionMismatch {
                active: target(2),
                attempted: target(1),
            })
        );
        assert_eq!(
            StreamState::Idle.apply(StreamTransition::Complete(target(1))),
            Err(StreamTransitionRejection::NoActiveStream)
        );
    }

    #[test]
    fn closed_state_accepts_a_new_submission() {
        let state = StreamState::Closed(target(1))
            .apply(StreamTransition::Start(target(2)))
            .unwrap();
        assert_eq!(state, StreamState::Sending(target(2)));
    }

    #[test]
    fn transcript_allocates_ids_and_tracks_open_turn() {
        let mut transcript = Transcript::new();
        let user = transcript.push_user("hi");
        let assistant = transcript.push_assistant_open(SubmissionId::new(7));

        assert_ne!(user, assistant);
        assert_eq!(transcript.turns()[0].role, Role::User);
        assert_eq!(transcript.open_turn().map(|turn| turn.id), Some(assistant));

        if let Some(turn) = transcript.get_mut(assistant) {
            turn.status = TurnStatus::Closed;
        }
        assert!(transcript.open_turn().is_none());
        assert_eq!(transcript.len(), 2);
    }
}
