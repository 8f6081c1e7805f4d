//! Match Rules
//!
//! Tunables of a match. `Default` gives the standard competition values.

use serde::{Deserialize, Serialize};

use crate::{scramble::Puzzle, ARM_HOLD_MS, DNF_LOCK_THRESHOLD, PLUS_TWO_MS, PREP_DURATION_MS, ROUND_COUNT};

/// What the repeated-DNF lock counts against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DnfScope {
    /// A whole team in squad mode (a single seat in duel mode)
    #[default]
    Side,
    /// Each seat individually
    Participant,
}

/// Rules for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchRules {
    /// Rounds per match
    pub round_count: usize,
    /// Preparation countdown in milliseconds
    pub prep_duration_ms: u64,
    /// Continuous hold required before the timer may start
    pub arm_hold_ms: u64,
    /// Time added by a +2 penalty
    pub plus_two_ms: u64,
    /// DNFs that lock the match
    pub dnf_lock_threshold: usize,
    /// Whether DNFs are counted per side or per seat
    pub dnf_scope: DnfScope,
    /// Largest gap allowed between the server stopwatch and a shorter
    /// client-reported time (`None` disables the check)
    pub stop_tolerance_ms: Option<u64>,
    /// Longest result that can be committed
    pub max_result_ms: u64,
    /// Scramble family
    pub puzzle: Puzzle,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            round_count: ROUND_COUNT,
            prep_duration_ms: PREP_DURATION_MS,
            arm_hold_ms: ARM_HOLD_MS,
            plus_two_ms: PLUS_TWO_MS,
            dnf_lock_threshold: DNF_LOCK_THRESHOLD,
            dnf_scope: DnfScope::Side,
            stop_tolerance_ms: Some(2_000),
            max_result_ms: 60 * 60 * 1000,
            puzzle: Puzzle::Cube3,
        }
    }
}
