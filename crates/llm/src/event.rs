/// Identifier of one chat session; changes on every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl SessionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identifier for one accepted submission inside a session.
///
/// This must change on every submit so stale fragments can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(pub u64);

impl SubmissionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Stream routing key used for stale-write rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamTarget {
    pub session_id: SessionId,
    pub submission_id: SubmissionId,
}

impl StreamTarget {
    pub const fn new(session_id: SessionId, submission_id: SubmissionId) -> Self {
        Self {
            session_id,
            submission_id,
        }
    }
}

/// Provider-agnostic stream payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventPayload {
    Delta(String),
    Done,
    Error(String),
}

/// One event travelling from a backend worker to the session that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEventMapped {
    pub target: StreamTarget,
    pub payload: StreamEventPayload,
}

impl StreamEventMapped {
    pub fn delta(target: StreamTarget, text: impl Into<String>) -> Self {
        Self {
            target,
            payload: StreamEventPayload::Delta(text.into()),
        }
    }

    pub fn done(target: StreamTarget) -> Self {
        Self {
            target,
            payload: StreamEventPayload::Done,
        }
    }

    pub fn error(target: StreamTarget, message: impl Into<String>) -> Self {
        Self {
            target,
            payload: StreamEventPayload::Error(message.into()),
        }
    }

    /// Returns true for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.payload, StreamEventPayload::Delta(_))
    }
}
