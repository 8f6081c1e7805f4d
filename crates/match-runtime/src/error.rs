//! Runtime Errors

use match_core::{MatchError, SessionId};
use thiserror::Error;

/// Errors returned to whoever submitted an intent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// The session rejected the intent
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The room's actor has stopped
    #[error("Room {0} is closed")]
    RoomClosed(SessionId),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),
}

impl RuntimeError {
    /// Machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::Match(e) => e.code(),
            RuntimeError::RoomClosed(_) => "RoomClosed",
            RuntimeError::UnknownSession(_) => "UnknownSession",
        }
    }
}
