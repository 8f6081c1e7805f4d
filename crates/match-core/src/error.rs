//! Match Errors
//!
//! Every rejection is local to the intent that caused it. A rejected
//! intent never mutates session state.

use thiserror::Error;

/// Match coordination errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("Not your turn")]
    OutOfTurn,

    #[error("Scramble for this round has not been dispensed yet")]
    NotReady,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Only the host may do this")]
    NotHost,

    #[error("Not eligible to respond to this rematch")]
    NotEligible,

    #[error("Session suspended: not enough participants")]
    QuorumLost,

    #[error("Session is full")]
    SessionFull,

    #[error("Seat is already taken")]
    SeatTaken,

    #[error("Invalid seat: {0}")]
    InvalidSeat(String),

    #[error("Participant not found")]
    UnknownParticipant,

    #[error("Session mode does not match")]
    ModeMismatch,
}

impl MatchError {
    /// Shorthand for `InvalidState` with a reason
    pub fn invalid(reason: impl Into<String>) -> Self {
        MatchError::InvalidState(reason.into())
    }

    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::OutOfTurn => "OutOfTurn",
            MatchError::NotReady => "NotReady",
            MatchError::InvalidState(_) => "InvalidState",
            MatchError::NotHost => "NotHost",
            MatchError::NotEligible => "NotEligible",
            MatchError::QuorumLost => "QuorumLost",
            MatchError::SessionFull => "SessionFull",
            MatchError::SeatTaken => "SeatTaken",
            MatchError::InvalidSeat(_) => "InvalidSeat",
            MatchError::UnknownParticipant => "UnknownParticipant",
            MatchError::ModeMismatch => "ModeMismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(MatchError::OutOfTurn.code(), "OutOfTurn");
        assert_eq!(MatchError::invalid("x").code(), "InvalidState");
        assert_eq!(
            MatchError::invalid("confirm without result").to_string(),
            "Invalid state: confirm without result"
        );
    }
}
