//! Match State
//!
//! Data model shared by every component: modes, seats, participants,
//! lifecycle and the small enums carried by solve attempts.

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Session identifier (room scoped, chosen by the room collaborator)
pub type SessionId = String;

/// Participant identifier (authenticated upstream)
pub type ParticipantId = String;

/// Match mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// 1 vs 1
    Duel,
    /// 2 vs 2
    Squad,
}

impl Mode {
    /// Participants required for the session to be Active
    pub fn quorum(self) -> usize {
        match self {
            Mode::Duel => 2,
            Mode::Squad => 4,
        }
    }

    /// Every seat this mode uses, in canonical turn order
    pub fn seats(self) -> Vec<Seat> {
        match self {
            Mode::Duel => vec![Seat::solo(0), Seat::solo(1)],
            Mode::Squad => vec![
                Seat::team(Team::A, 0),
                Seat::team(Team::B, 0),
                Seat::team(Team::A, 1),
                Seat::team(Team::B, 1),
            ],
        }
    }
}

/// Team in squad mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

/// A seat at the table. Turn order and results are keyed by seat so that a
/// replacement participant inherits the results of the seat they fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seat {
    /// `None` only in duel mode
    pub team: Option<Team>,
    /// 0 or 1
    pub slot: u8,
}

impl Seat {
    pub fn solo(slot: u8) -> Self {
        Self { team: None, slot }
    }

    pub fn team(team: Team, slot: u8) -> Self {
        Self {
            team: Some(team),
            slot,
        }
    }

    /// The competing side this seat belongs to
    pub fn side(self) -> Side {
        match self.team {
            Some(team) => Side::Team(team),
            None => Side::Solo(self),
        }
    }
}

/// A competing side: a whole team in squad mode, a single seat in duel mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Team(Team),
    Solo(Seat),
}

/// One human competitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub seat: Seat,
    pub is_host: bool,
    /// Join order within the session, used for host hand-over
    pub joined_seq: u64,
}

impl Participant {
    pub fn team(&self) -> Option<Team> {
        self.seat.team
    }

    pub fn slot(&self) -> u8 {
        self.seat.slot
    }
}

/// Lifecycle a suspended session returns to once quorum is restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resume {
    Active,
    Locked,
    Concluded,
}

impl From<Resume> for Lifecycle {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::Active => Lifecycle::Active,
            Resume::Locked => Lifecycle::Locked,
            Resume::Concluded => Lifecycle::Concluded,
        }
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Lifecycle {
    Forming,
    Active,
    Locked,
    Concluded,
    Resetting,
    /// Quorum lost after formation; accumulated results are kept
    Suspended { resume_to: Resume },
}

impl Lifecycle {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        match (self, next) {
            (Forming, Active) => true,
            (Active, Locked) | (Active, Concluded) => true,
            (Locked, Resetting) | (Concluded, Resetting) => true,
            (Resetting, Active) => true,
            (Active, Suspended { resume_to: Resume::Active })
            | (Locked, Suspended { resume_to: Resume::Locked })
            | (Concluded, Suspended { resume_to: Resume::Concluded }) => true,
            (Suspended { resume_to }, next) => Lifecycle::from(resume_to) == next,
            _ => false,
        }
    }

    /// Checked transition
    pub fn transition(self, next: Lifecycle) -> Result<Lifecycle, MatchError> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(MatchError::invalid(format!(
                "illegal lifecycle transition {:?} -> {:?}",
                self, next
            )))
        }
    }

    /// Suspended form of this lifecycle, if it can be suspended
    pub fn suspended(self) -> Option<Lifecycle> {
        let resume_to = match self {
            Lifecycle::Active => Resume::Active,
            Lifecycle::Locked => Resume::Locked,
            Lifecycle::Concluded => Resume::Concluded,
            _ => return None,
        };
        Some(Lifecycle::Suspended { resume_to })
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Lifecycle::Locked | Lifecycle::Concluded)
    }
}

/// Penalty applied on confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Penalty {
    #[default]
    None,
    PlusTwo,
    Dnf,
}

/// Solve attempt state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptState {
    Idle,
    Preparing,
    Running,
    PendingResult,
    Committed,
}

impl AttemptState {
    /// Preparing, Running or PendingResult
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            AttemptState::Preparing | AttemptState::Running | AttemptState::PendingResult
        )
    }
}

/// A point in time as seen by the session actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Moment {
    /// Monotonic milliseconds since the actor started
    pub mono_ms: u64,
    /// Wall clock (unix millis), only used for client-facing timestamps
    pub unix_ms: i64,
}

impl Moment {
    pub fn new(mono_ms: u64, unix_ms: i64) -> Self {
        Self { mono_ms, unix_ms }
    }

    /// Monotonic-only moment, handy in tests
    pub fn at(mono_ms: u64) -> Self {
        Self {
            mono_ms,
            unix_ms: mono_ms as i64,
        }
    }
}
