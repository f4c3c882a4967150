//! Error types for arbitration operations

use crate::policy::Category;
use crate::session::{InvalidTransition, LifecycleState, SessionId};

/// Start refused because an active session has priority
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Session {session_id} ({category}) rejected by active {conflicting_category} session {conflicting_id}"
)]
pub struct SessionRejected {
    pub session_id: SessionId,
    pub category: Category,
    pub conflicting_id: SessionId,
    pub conflicting_category: Category,
}

/// Error types for engine operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArbitrationError {
    #[error(transparent)]
    Rejected(#[from] SessionRejected),
    #[error("Session {session_id} cannot {operation} while {state}")]
    InvalidState {
        session_id: SessionId,
        state: LifecycleState,
        operation: &'static str,
    },
    #[error("Session {0} is not registered")]
    UnknownSession(SessionId),
}

impl ArbitrationError {
    pub fn invalid_transition(transition: InvalidTransition, operation: &'static str) -> Self {
        ArbitrationError::InvalidState {
            session_id: transition.session_id,
            state: transition.from,
            operation,
        }
    }

    /// The policy rejection, if this error is one
    pub fn rejection(&self) -> Option<&SessionRejected> {
        match self {
            ArbitrationError::Rejected(rejected) => Some(rejected),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.rejection().is_some()
    }
}
