//! Scoring Engine
//!
//! Pure reducers over committed attempts. Results are `Option<u64>`
//! milliseconds where `None` is a DNF.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    solve::SolveAttempt,
    state::{AttemptState, Mode, Seat, Side, Team},
};

/// Points by rank within a squad round
const RANK_POINTS: [u32; 4] = [3, 2, 1, 0];

/// Match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Outcome {
    Winner { side: Side },
    Draw,
}

impl Outcome {
    pub fn winner(self) -> Option<Side> {
        match self {
            Outcome::Winner { side } => Some(side),
            Outcome::Draw => None,
        }
    }
}

/// Statistics for one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideStats {
    pub side: Side,
    pub solves: usize,
    pub dnf_count: usize,
    /// Fastest non-DNF result
    pub best_ms: Option<u64>,
    /// Slowest result; undefined once any DNF is present
    pub worst_ms: Option<u64>,
    /// Trimmed average; undefined with two or more DNFs
    pub average_ms: Option<u64>,
    /// Squad round points (always 0 in duel mode)
    pub points: u32,
}

/// One seat's result inside a squad round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatPoints {
    pub seat: Seat,
    pub value_ms: Option<u64>,
    pub points: u32,
}

/// Points for one complete squad round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundScore {
    pub round: usize,
    pub seats: Vec<SeatPoints>,
    pub team_a: u32,
    pub team_b: u32,
}

/// Everything derived from the committed results of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSheet {
    pub per_side: Vec<SideStats>,
    pub per_round: Vec<RoundScore>,
    pub outcome: Outcome,
}

impl ScoreSheet {
    pub fn side(&self, side: Side) -> Option<&SideStats> {
        self.per_side.iter().find(|s| s.side == side)
    }
}

/// DNF sorts after every time
fn compare_results(a: &Option<u64>, b: &Option<u64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn mean(values: &[u64]) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    let count = values.len() as u64;
    let sum: u64 = values.iter().sum();
    Some((sum + count / 2) / count)
}

/// Fastest non-DNF result
pub fn best(results: &[Option<u64>]) -> Option<u64> {
    results.iter().flatten().copied().min()
}

/// Slowest result, undefined if any result is a DNF
pub fn worst(results: &[Option<u64>]) -> Option<u64> {
    if results.iter().any(Option::is_none) {
        return None;
    }
    results.iter().flatten().copied().max()
}

/// Trimmed average (average-of-5 for a full match).
///
/// With three or more results the single best and single worst are
/// dropped (a DNF counts as the worst) and the rest are averaged; two or
/// more DNFs make it undefined. With fewer than three results every result
/// is averaged and any DNF makes it undefined. Rounded to the nearest ms.
pub fn trimmed_average(results: &[Option<u64>]) -> Option<u64> {
    let dnfs = results.iter().filter(|r| r.is_none()).count();
    if results.len() >= 3 {
        if dnfs >= 2 {
            return None;
        }
        let mut sorted = results.to_vec();
        sorted.sort_by(compare_results);
        let kept: Vec<u64> = sorted[1..sorted.len() - 1].iter().flatten().copied().collect();
        mean(&kept)
    } else {
        if dnfs > 0 {
            return None;
        }
        let values: Vec<u64> = results.iter().flatten().copied().collect();
        mean(&values)
    }
}

/// Rank one squad round.
///
/// Ascending by time with DNFs last; ranks earn 3/2/1/0 points, equal
/// times share the better rank, and a DNF always earns 0.
pub fn rank_round(results: &[(Seat, Option<u64>)]) -> Vec<SeatPoints> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| compare_results(&a.1, &b.1));

    let mut ranked = Vec::with_capacity(sorted.len());
    for (index, (seat, value)) in sorted.iter().enumerate() {
        let rank = sorted
            .iter()
            .position(|(_, other)| compare_results(other, value) == Ordering::Equal)
            .unwrap_or(index);
        let points = match value {
            Some(_) => RANK_POINTS.get(rank).copied().unwrap_or(0),
            None => 0,
        };
        ranked.push(SeatPoints {
            seat: *seat,
            value_ms: *value,
            points,
        });
    }
    ranked
}

/// Stats for a set of results
pub fn side_stats(side: Side, results: &[Option<u64>], points: u32) -> SideStats {
    SideStats {
        side,
        solves: results.len(),
        dnf_count: results.iter().filter(|r| r.is_none()).count(),
        best_ms: best(results),
        worst_ms: worst(results),
        average_ms: trimmed_average(results),
        points,
    }
}

/// Lower average wins; undefined loses to defined; both undefined or
/// exactly equal is a draw.
pub fn decide_by_average(a: &SideStats, b: &SideStats) -> Outcome {
    match (a.average_ms, b.average_ms) {
        (Some(x), Some(y)) if x < y => Outcome::Winner { side: a.side },
        (Some(x), Some(y)) if y < x => Outcome::Winner { side: b.side },
        (Some(_), None) => Outcome::Winner { side: a.side },
        (None, Some(_)) => Outcome::Winner { side: b.side },
        _ => Outcome::Draw,
    }
}

/// Points first (squad), then average
pub fn decide(mode: Mode, a: &SideStats, b: &SideStats) -> Outcome {
    if mode == Mode::Squad {
        match a.points.cmp(&b.points) {
            Ordering::Greater => return Outcome::Winner { side: a.side },
            Ordering::Less => return Outcome::Winner { side: b.side },
            Ordering::Equal => {}
        }
    }
    decide_by_average(a, b)
}

/// The two competing sides of a mode
pub fn sides(mode: Mode) -> [Side; 2] {
    match mode {
        Mode::Duel => [Side::Solo(Seat::solo(0)), Side::Solo(Seat::solo(1))],
        Mode::Squad => [Side::Team(Team::A), Side::Team(Team::B)],
    }
}

fn committed(attempts: &[SolveAttempt]) -> impl Iterator<Item = &SolveAttempt> {
    attempts.iter().filter(|a| a.state == AttemptState::Committed)
}

/// Results of one side in round order
pub fn results_for(side: Side, attempts: &[SolveAttempt]) -> Vec<Option<u64>> {
    let mut own: Vec<&SolveAttempt> = committed(attempts).filter(|a| a.seat.side() == side).collect();
    own.sort_by_key(|a| (a.round, a.seat));
    own.iter().map(|a| a.committed_value).collect()
}

/// Points for every complete squad round (all four results committed)
pub fn round_scores(attempts: &[SolveAttempt]) -> Vec<RoundScore> {
    let last_round = committed(attempts).map(|a| a.round).max();
    let Some(last_round) = last_round else {
        return Vec::new();
    };

    (0..=last_round)
        .filter_map(|round| {
            let results: Vec<(Seat, Option<u64>)> = committed(attempts)
                .filter(|a| a.round == round)
                .map(|a| (a.seat, a.committed_value))
                .collect();
            if results.len() < Mode::Squad.quorum() {
                return None;
            }
            let seats = rank_round(&results);
            let team_total = |team: Team| -> u32 {
                seats
                    .iter()
                    .filter(|s| s.seat.team == Some(team))
                    .map(|s| s.points)
                    .sum()
            };
            Some(RoundScore {
                round,
                team_a: team_total(Team::A),
                team_b: team_total(Team::B),
                seats,
            })
        })
        .collect()
}

/// Score a match from its attempts
pub fn compute(mode: Mode, attempts: &[SolveAttempt]) -> ScoreSheet {
    let per_round = match mode {
        Mode::Squad => round_scores(attempts),
        Mode::Duel => Vec::new(),
    };

    let [side_a, side_b] = sides(mode);
    let points_a: u32 = per_round.iter().map(|r| r.team_a).sum();
    let points_b: u32 = per_round.iter().map(|r| r.team_b).sum();

    let a = side_stats(side_a, &results_for(side_a, attempts), points_a);
    let b = side_stats(side_b, &results_for(side_b, attempts), points_b);
    let outcome = decide(mode, &a, &b);

    ScoreSheet {
        per_side: vec![a, b],
        per_round,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Penalty;

    fn committed_attempt(seat: Seat, round: usize, value: Option<u64>) -> SolveAttempt {
        let mut a = SolveAttempt::new(format!("{:?}", seat), seat, round, format!("s{}", round));
        a.state = AttemptState::Committed;
        a.committed_value = value;
        a.penalty = if value.is_none() { Penalty::Dnf } else { Penalty::None };
        a
    }

    #[test]
    fn test_best_and_worst() {
        let results = [Some(8_000), None, Some(7_000)];
        assert_eq!(best(&results), Some(7_000));
        assert_eq!(worst(&results), None);
        assert_eq!(worst(&[Some(8_000), Some(9_500)]), Some(9_500));
        assert_eq!(best(&[None, None]), None);
    }

    #[test]
    fn test_average_of_five() {
        let all = [Some(8_000), Some(9_000), Some(10_000), Some(11_000), Some(7_000)];
        assert_eq!(trimmed_average(&all), Some(9_000));

        // Single DNF is dropped as the worst
        let one_dnf = [Some(8_000), Some(9_000), Some(10_000), None, Some(7_000)];
        assert_eq!(trimmed_average(&one_dnf), Some(9_000));

        let two_dnf = [Some(8_500), Some(8_800), None, None, Some(7_200)];
        assert_eq!(trimmed_average(&two_dnf), None);
    }

    #[test]
    fn test_average_ignores_order() {
        let a = [Some(8_100), None, Some(9_300), Some(7_700), Some(12_000)];
        let mut b = a;
        b.reverse();
        let mut c = a;
        c.rotate_left(2);
        assert_eq!(trimmed_average(&a), trimmed_average(&b));
        assert_eq!(trimmed_average(&a), trimmed_average(&c));
        assert_eq!(trimmed_average(&a), Some(9_800));
    }

    #[test]
    fn test_short_averages() {
        assert_eq!(trimmed_average(&[]), None);
        assert_eq!(trimmed_average(&[Some(9_001), Some(9_002)]), Some(9_002));
        assert_eq!(trimmed_average(&[Some(9_000), None]), None);
        assert_eq!(trimmed_average(&[Some(6_000), None, Some(9_000)]), Some(9_000));
    }

    #[test]
    fn test_squad_round_ranking() {
        let results = [
            (Seat::team(Team::A, 0), Some(9_500)),
            (Seat::team(Team::A, 1), None),
            (Seat::team(Team::B, 0), Some(9_000)),
            (Seat::team(Team::B, 1), Some(10_200)),
        ];
        let ranked = rank_round(&results);
        let points_of = |seat: Seat| ranked.iter().find(|s| s.seat == seat).unwrap().points;
        assert_eq!(points_of(Seat::team(Team::B, 0)), 3);
        assert_eq!(points_of(Seat::team(Team::A, 0)), 2);
        assert_eq!(points_of(Seat::team(Team::B, 1)), 1);
        assert_eq!(points_of(Seat::team(Team::A, 1)), 0);

        let attempts: Vec<SolveAttempt> = results
            .iter()
            .map(|(seat, value)| committed_attempt(*seat, 0, *value))
            .collect();
        let rounds = round_scores(&attempts);
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].team_a, 2);
        assert_eq!(rounds[0].team_b, 4);
    }

    #[test]
    fn test_dnf_scores_zero_even_when_ranked_above_a_time() {
        // Both DNFs share third rank and still earn nothing
        let results = [
            (Seat::team(Team::A, 0), None),
            (Seat::team(Team::A, 1), Some(20_000)),
            (Seat::team(Team::B, 0), None),
            (Seat::team(Team::B, 1), Some(9_000)),
        ];
        let ranked = rank_round(&results);
        let total: u32 = ranked.iter().map(|s| s.points).sum();
        assert_eq!(total, 5);
        assert!(ranked.iter().filter(|s| s.value_ms.is_none()).all(|s| s.points == 0));
    }

    #[test]
    fn test_equal_times_share_rank() {
        let results = [
            (Seat::team(Team::A, 0), Some(9_000)),
            (Seat::team(Team::B, 0), Some(9_000)),
            (Seat::team(Team::A, 1), Some(9_500)),
            (Seat::team(Team::B, 1), Some(9_900)),
        ];
        let ranked = rank_round(&results);
        let points: Vec<u32> = ranked.iter().map(|s| s.points).collect();
        assert_eq!(points, vec![3, 3, 1, 0]);
    }

    #[test]
    fn test_incomplete_squad_round_not_scored() {
        let attempts = vec![
            committed_attempt(Seat::team(Team::A, 0), 0, Some(9_000)),
            committed_attempt(Seat::team(Team::B, 0), 0, Some(9_500)),
        ];
        assert!(round_scores(&attempts).is_empty());
    }

    #[test]
    fn test_duel_scenario() {
        let a_times = [Some(8_000), Some(9_000), Some(10_000), None, Some(7_000)];
        let b_times = [Some(8_500), Some(8_800), None, None, Some(7_200)];
        let mut attempts = Vec::new();
        for round in 0..5 {
            attempts.push(committed_attempt(Seat::solo(0), round, a_times[round]));
            attempts.push(committed_attempt(Seat::solo(1), round, b_times[round]));
        }

        let sheet = compute(Mode::Duel, &attempts);
        let a = sheet.side(Side::Solo(Seat::solo(0))).unwrap();
        let b = sheet.side(Side::Solo(Seat::solo(1))).unwrap();
        assert_eq!(a.average_ms, Some(9_000));
        assert_eq!(a.best_ms, Some(7_000));
        assert_eq!(a.worst_ms, None);
        assert_eq!(b.average_ms, None);
        assert_eq!(b.dnf_count, 2);
        assert_eq!(
            sheet.outcome,
            Outcome::Winner {
                side: Side::Solo(Seat::solo(0))
            }
        );
        assert!(sheet.per_round.is_empty());
    }

    #[test]
    fn test_squad_points_then_average() {
        // Round 0: A wins 5-1; round 1: B wins 5-1 -> tie on points
        let mut attempts = vec![
            committed_attempt(Seat::team(Team::A, 0), 0, Some(8_000)),
            committed_attempt(Seat::team(Team::B, 0), 0, Some(9_000)),
            committed_attempt(Seat::team(Team::A, 1), 0, Some(8_500)),
            committed_attempt(Seat::team(Team::B, 1), 0, Some(9_500)),
            committed_attempt(Seat::team(Team::A, 0), 1, Some(10_000)),
            committed_attempt(Seat::team(Team::B, 0), 1, Some(7_000)),
            committed_attempt(Seat::team(Team::A, 1), 1, Some(10_500)),
            committed_attempt(Seat::team(Team::B, 1), 1, Some(7_500)),
        ];
        let sheet = compute(Mode::Squad, &attempts);
        assert_eq!(sheet.side(Side::Team(Team::A)).unwrap().points, 6);
        assert_eq!(sheet.side(Side::Team(Team::B)).unwrap().points, 6);
        // A: drop 8000/10500 -> mean(8500, 10000) = 9250; B: drop 7000/9500 -> 8250
        assert_eq!(
            sheet.outcome,
            Outcome::Winner {
                side: Side::Team(Team::B)
            }
        );

        attempts.push(committed_attempt(Seat::team(Team::A, 0), 2, Some(5_000)));
        attempts.push(committed_attempt(Seat::team(Team::B, 0), 2, Some(6_000)));
        attempts.push(committed_attempt(Seat::team(Team::A, 1), 2, Some(5_500)));
        attempts.push(committed_attempt(Seat::team(Team::B, 1), 2, Some(6_500)));
        let sheet = compute(Mode::Squad, &attempts);
        assert_eq!(
            sheet.outcome,
            Outcome::Winner {
                side: Side::Team(Team::A)
            }
        );
    }

    #[test]
    fn test_all_dnf_is_draw() {
        let attempts = vec![
            committed_attempt(Seat::solo(0), 0, None),
            committed_attempt(Seat::solo(1), 0, None),
        ];
        assert_eq!(compute(Mode::Duel, &attempts).outcome, Outcome::Draw);
        assert_eq!(compute(Mode::Duel, &[]).outcome, Outcome::Draw);
    }

    #[test]
    fn test_exact_tie_is_draw() {
        let attempts = vec![
            committed_attempt(Seat::solo(0), 0, Some(9_000)),
            committed_attempt(Seat::solo(1), 0, Some(9_000)),
        ];
        assert_eq!(compute(Mode::Duel, &attempts).outcome, Outcome::Draw);
    }
}
