//! Match Core - Server-authoritative coordination for timed solve matches
//!
//! This crate holds the pure domain layer of a head-to-head match:
//! - Session lifecycle, roster and seat assignment
//! - Turn arbitration and the per-attempt solve state machine
//! - Scramble dispensing, scoring, early termination and rematch consensus
//!
//! Nothing in here performs I/O. The owning actor passes the current
//! `Moment` into every call that depends on time.

pub mod error;
pub mod event;
pub mod intent;
pub mod rematch;
pub mod rules;
pub mod scoring;
pub mod scramble;
pub mod session;
pub mod solve;
pub mod state;
pub mod termination;
pub mod turn;

pub use error::MatchError;
pub use event::MatchEvent;
pub use intent::Intent;
pub use rematch::{CancelReason, RematchRequest};
pub use rules::{DnfScope, MatchRules};
pub use scoring::{Outcome, ScoreSheet, SideStats};
pub use scramble::{FixedScrambles, Puzzle, RandomScrambler, ScrambleSource};
pub use session::{Session, SessionSnapshot};
pub use solve::SolveAttempt;
pub use state::{
    AttemptState, Lifecycle, Mode, Moment, Participant, ParticipantId, Penalty, Resume, Seat,
    SessionId, Side, Team,
};
pub use termination::{LockReason, LockVerdict};

/// Rounds per match
pub const ROUND_COUNT: usize = 5;

/// Preparation countdown before a forced DNF (15 seconds)
pub const PREP_DURATION_MS: u64 = 15_000;

/// Minimum continuous hold inside Preparing before the timer may start
pub const ARM_HOLD_MS: u64 = 300;

/// Time added by a +2 penalty
pub const PLUS_TWO_MS: u64 = 2_000;

/// DNF count that locks a match
pub const DNF_LOCK_THRESHOLD: usize = 2;
