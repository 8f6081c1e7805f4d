//! Termination Rule Evaluator
//!
//! Runs after every commit. Once a side (or seat, depending on
//! `DnfScope`) reaches the DNF threshold the match locks on the spot and a
//! provisional winner is picked by average over the results so far.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    rules::{DnfScope, MatchRules},
    scoring::{self, Outcome},
    solve::SolveAttempt,
    state::{Mode, Side},
};

/// Why a match was locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LockReason {
    RepeatedDnf { side: Side, dnf_count: usize },
}

/// Result of a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockVerdict {
    pub reason: LockReason,
    pub outcome: Outcome,
}

/// Check committed attempts for the repeated-DNF condition
pub fn evaluate(mode: Mode, rules: &MatchRules, attempts: &[SolveAttempt]) -> Option<LockVerdict> {
    let mut counts: BTreeMap<Side, usize> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| a.is_dnf()) {
        let key = match rules.dnf_scope {
            DnfScope::Side => attempt.seat.side(),
            DnfScope::Participant => match attempt.seat.team {
                // Seats are keyed as solo sides so teammates count apart
                Some(_) => Side::Solo(attempt.seat),
                None => attempt.seat.side(),
            },
        };
        *counts.entry(key).or_default() += 1;
    }

    let (offender, dnf_count) = counts
        .into_iter()
        .find(|(_, count)| *count >= rules.dnf_lock_threshold)?;

    let side = match offender {
        Side::Solo(seat) => seat.side(),
        team => team,
    };

    let [a, b] = scoring::sides(mode);
    let stats_a = scoring::side_stats(a, &scoring::results_for(a, attempts), 0);
    let stats_b = scoring::side_stats(b, &scoring::results_for(b, attempts), 0);
    let outcome = scoring::decide_by_average(&stats_a, &stats_b);

    Some(LockVerdict {
        reason: LockReason::RepeatedDnf { side, dnf_count },
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AttemptState, Penalty, Seat, Team};

    fn committed(seat: Seat, round: usize, value: Option<u64>) -> SolveAttempt {
        let mut a = SolveAttempt::new("p".to_string(), seat, round, String::new());
        a.state = AttemptState::Committed;
        a.committed_value = value;
        if value.is_none() {
            a.penalty = Penalty::Dnf;
        }
        a
    }

    #[test]
    fn test_single_dnf_does_not_lock() {
        let attempts = vec![
            committed(Seat::solo(0), 0, None),
            committed(Seat::solo(1), 0, Some(9_000)),
        ];
        assert!(evaluate(Mode::Duel, &MatchRules::default(), &attempts).is_none());
    }

    #[test]
    fn test_second_dnf_locks_with_other_side_winning() {
        let attempts = vec![
            committed(Seat::solo(0), 0, Some(8_000)),
            committed(Seat::solo(1), 0, None),
            committed(Seat::solo(0), 1, Some(9_000)),
            committed(Seat::solo(1), 1, None),
        ];
        let verdict = evaluate(Mode::Duel, &MatchRules::default(), &attempts).unwrap();
        assert_eq!(
            verdict.reason,
            LockReason::RepeatedDnf {
                side: Side::Solo(Seat::solo(1)),
                dnf_count: 2
            }
        );
        assert_eq!(verdict.outcome.winner(), Some(Side::Solo(Seat::solo(0))));
    }

    #[test]
    fn test_squad_side_scope_counts_teammates_together() {
        let attempts = vec![
            committed(Seat::team(Team::A, 0), 0, None),
            committed(Seat::team(Team::B, 0), 0, Some(9_000)),
            committed(Seat::team(Team::A, 1), 0, None),
        ];
        let verdict = evaluate(Mode::Squad, &MatchRules::default(), &attempts).unwrap();
        assert_eq!(
            verdict.reason,
            LockReason::RepeatedDnf {
                side: Side::Team(Team::A),
                dnf_count: 2
            }
        );
        assert_eq!(verdict.outcome.winner(), Some(Side::Team(Team::B)));

        let per_seat = MatchRules {
            dnf_scope: DnfScope::Participant,
            ..MatchRules::default()
        };
        assert!(evaluate(Mode::Squad, &per_seat, &attempts).is_none());
    }

    #[test]
    fn test_both_sides_undefined_is_draw() {
        let rules = MatchRules {
            dnf_scope: DnfScope::Participant,
            ..MatchRules::default()
        };
        let attempts = vec![
            committed(Seat::team(Team::A, 0), 0, None),
            committed(Seat::team(Team::B, 0), 0, None),
            committed(Seat::team(Team::A, 1), 0, None),
            committed(Seat::team(Team::B, 1), 0, Some(9_000)),
            committed(Seat::team(Team::A, 0), 1, None),
        ];
        let verdict = evaluate(Mode::Squad, &rules, &attempts).unwrap();
        assert_eq!(verdict.outcome, Outcome::Draw);
    }
}
