use crate::foundation::TetherError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a threshold signing session.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created locally, not yet broadcast to participants.
    Proposed,
    /// Broadcast; partial signatures are being collected.
    Collecting,
    /// Threshold met with every counted participant reachable. Terminal.
    Completed,
    /// Rejected, cancelled or fatally invalid. Terminal.
    Failed { reason: String },
    /// Deadline passed with threshold unmet. Terminal.
    Expired,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum StateKind {
    Proposed,
    Collecting,
    Completed,
    Failed,
    Expired,
}

const VALID_TRANSITIONS: &[(StateKind, StateKind)] = &[
    (StateKind::Proposed, StateKind::Collecting),
    (StateKind::Proposed, StateKind::Failed),
    (StateKind::Proposed, StateKind::Expired),
    (StateKind::Collecting, StateKind::Completed),
    (StateKind::Collecting, StateKind::Failed),
    (StateKind::Collecting, StateKind::Expired),
];

fn state_kind(state: &SessionState) -> StateKind {
    match state {
        SessionState::Proposed => StateKind::Proposed,
        SessionState::Collecting => StateKind::Collecting,
        SessionState::Completed => StateKind::Completed,
        SessionState::Failed { .. } => StateKind::Failed,
        SessionState::Expired => StateKind::Expired,
    }
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed { .. } | SessionState::Expired)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Proposed => "proposed",
            SessionState::Collecting => "collecting",
            SessionState::Completed => "completed",
            SessionState::Failed { .. } => "failed",
            SessionState::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn is_valid_transition(from: &SessionState, to: &SessionState) -> bool {
    let from_kind = state_kind(from);
    let to_kind = state_kind(to);
    // Collecting -> Collecting: each accepted signature is a self-transition.
    if from_kind == to_kind {
        return from_kind == StateKind::Collecting;
    }
    VALID_TRANSITIONS.contains(&(from_kind, to_kind))
}

pub fn ensure_valid_transition(from: &SessionState, to: &SessionState) -> Result<(), TetherError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(TetherError::InvalidStateTransition { from: from.name().to_string(), to: to.name().to_string() })
    }
}
