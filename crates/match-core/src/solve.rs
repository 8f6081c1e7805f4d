//! Solve State Machine
//!
//! One attempt by one participant in one round:
//! Idle -> Preparing -> Running -> PendingResult -> Committed,
//! with Preparing -> Committed(DNF) when the countdown runs out.

use serde::{Deserialize, Serialize};

use crate::{
    error::MatchError,
    rules::MatchRules,
    state::{AttemptState, Moment, ParticipantId, Penalty, Seat},
};

/// A solve attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveAttempt {
    pub participant_id: ParticipantId,
    pub seat: Seat,
    pub round: usize,
    /// Scramble the attempt was solved against
    pub scramble: String,
    pub state: AttemptState,
    /// Client-proposed elapsed time, authoritative once Committed
    pub elapsed_ms: Option<u64>,
    pub penalty: Penalty,
    /// Final value; `None` encodes DNF
    pub committed_value: Option<u64>,
    #[serde(skip)]
    prep_deadline_ms: Option<u64>,
    #[serde(skip)]
    hold_since_ms: Option<u64>,
    #[serde(skip)]
    started_at_ms: Option<u64>,
}

impl SolveAttempt {
    /// Fresh attempt for the holder of a turn
    pub fn new(participant_id: ParticipantId, seat: Seat, round: usize, scramble: String) -> Self {
        Self {
            participant_id,
            seat,
            round,
            scramble,
            state: AttemptState::Idle,
            elapsed_ms: None,
            penalty: Penalty::None,
            committed_value: None,
            prep_deadline_ms: None,
            hold_since_ms: None,
            started_at_ms: None,
        }
    }

    /// Committed DNF
    pub fn is_dnf(&self) -> bool {
        self.state == AttemptState::Committed && self.committed_value.is_none()
    }

    fn expect_state(&self, expected: AttemptState, intent: &str) -> Result<(), MatchError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(MatchError::invalid(format!(
                "{} not allowed while {:?}",
                intent, self.state
            )))
        }
    }

    /// Idle -> Preparing. Returns the countdown deadline.
    pub fn begin_prep(&mut self, now: Moment, rules: &MatchRules) -> Result<u64, MatchError> {
        self.expect_state(AttemptState::Idle, "beginPrep")?;
        let deadline = now.mono_ms + rules.prep_duration_ms;
        self.state = AttemptState::Preparing;
        self.prep_deadline_ms = Some(deadline);
        self.hold_since_ms = None;
        Ok(deadline)
    }

    /// Holder pressed or released during Preparing
    pub fn hold(&mut self, pressed: bool, now: Moment) -> Result<(), MatchError> {
        self.expect_state(AttemptState::Preparing, "hold")?;
        if pressed {
            // Repeated presses keep the original start of the hold
            self.hold_since_ms.get_or_insert(now.mono_ms);
        } else {
            self.hold_since_ms = None;
        }
        Ok(())
    }

    /// Milliseconds left on the countdown
    pub fn remaining_prep_ms(&self, now: Moment) -> Option<u64> {
        match (self.state, self.prep_deadline_ms) {
            (AttemptState::Preparing, Some(deadline)) => Some(deadline.saturating_sub(now.mono_ms)),
            _ => None,
        }
    }

    /// Countdown has reached zero
    pub fn prep_expired(&self, now: Moment) -> bool {
        self.remaining_prep_ms(now) == Some(0)
    }

    /// Preparing -> Running, after an unbroken hold of `arm_hold_ms`
    pub fn arm_and_start(&mut self, now: Moment, rules: &MatchRules) -> Result<(), MatchError> {
        self.expect_state(AttemptState::Preparing, "armAndStart")?;
        if self.prep_expired(now) {
            return Err(MatchError::invalid("preparation time is over"));
        }
        let held_for = self
            .hold_since_ms
            .map(|since| now.mono_ms.saturating_sub(since))
            .ok_or_else(|| MatchError::invalid("timer is not being held"))?;
        if held_for < rules.arm_hold_ms {
            return Err(MatchError::invalid(format!(
                "held for {}ms, need {}ms",
                held_for, rules.arm_hold_ms
            )));
        }
        self.state = AttemptState::Running;
        self.started_at_ms = Some(now.mono_ms);
        self.prep_deadline_ms = None;
        self.hold_since_ms = None;
        Ok(())
    }

    /// Preparing -> Committed(DNF) once the countdown is exhausted
    pub fn expire(&mut self) -> Result<(), MatchError> {
        self.expect_state(AttemptState::Preparing, "expire")?;
        self.commit_dnf();
        Ok(())
    }

    /// Running -> PendingResult with the holder's own stopwatch reading
    pub fn stop(&mut self, elapsed_ms: u64, now: Moment, rules: &MatchRules) -> Result<(), MatchError> {
        self.expect_state(AttemptState::Running, "stop")?;
        if elapsed_ms == 0 {
            return Err(MatchError::invalid("elapsed time must be positive"));
        }
        if let (Some(tolerance), Some(started)) = (rules.stop_tolerance_ms, self.started_at_ms) {
            let measured = now.mono_ms.saturating_sub(started);
            if elapsed_ms.saturating_add(tolerance) < measured {
                return Err(MatchError::invalid(format!(
                    "reported {}ms but the server measured {}ms",
                    elapsed_ms, measured
                )));
            }
        }
        self.state = AttemptState::PendingResult;
        self.elapsed_ms = Some(elapsed_ms);
        Ok(())
    }

    /// PendingResult -> Committed.
    ///
    /// A value that fails validation is committed as DNF and the error is
    /// still returned: the turn moves on either way.
    pub fn confirm(&mut self, penalty: Penalty, rules: &MatchRules) -> Result<(), MatchError> {
        self.expect_state(AttemptState::PendingResult, "confirm")?;
        let elapsed = self
            .elapsed_ms
            .ok_or_else(|| MatchError::invalid("no pending result"))?;

        let value = match penalty {
            Penalty::None => elapsed,
            Penalty::PlusTwo => elapsed.saturating_add(rules.plus_two_ms),
            Penalty::Dnf => {
                self.penalty = Penalty::Dnf;
                self.commit_dnf();
                return Ok(());
            }
        };

        if value > rules.max_result_ms {
            self.commit_dnf();
            return Err(MatchError::invalid(format!(
                "result {}ms is out of range, recorded as DNF",
                value
            )));
        }
        self.state = AttemptState::Committed;
        self.penalty = penalty;
        self.committed_value = Some(value);
        Ok(())
    }

    /// The session was suspended under this attempt. A hold in progress is
    /// dropped, and the server's own start time no longer bounds `stop`.
    pub fn interrupt(&mut self) {
        self.hold_since_ms = None;
        self.started_at_ms = None;
    }

    /// Any open state -> Committed(DNF). Used when the seat changes hands
    /// mid-attempt.
    pub fn forfeit(&mut self) -> Result<(), MatchError> {
        if self.state == AttemptState::Committed {
            return Err(MatchError::invalid("attempt already committed"));
        }
        self.commit_dnf();
        Ok(())
    }

    fn commit_dnf(&mut self) {
        self.state = AttemptState::Committed;
        self.penalty = Penalty::Dnf;
        self.committed_value = None;
        self.prep_deadline_ms = None;
        self.hold_since_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> SolveAttempt {
        SolveAttempt::new("alice".to_string(), Seat::solo(0), 0, "R U R'".to_string())
    }

    fn run_to_pending(a: &mut SolveAttempt, rules: &MatchRules, elapsed: u64) {
        a.begin_prep(Moment::at(0), rules).unwrap();
        a.hold(true, Moment::at(1_000)).unwrap();
        a.arm_and_start(Moment::at(1_400), rules).unwrap();
        a.stop(elapsed, Moment::at(1_400 + elapsed), rules).unwrap();
    }

    #[test]
    fn test_full_cycle() {
        let rules = MatchRules::default();
        let mut a = attempt();
        run_to_pending(&mut a, &rules, 9_000);
        assert_eq!(a.state, AttemptState::PendingResult);
        a.confirm(Penalty::None, &rules).unwrap();
        assert_eq!(a.state, AttemptState::Committed);
        assert_eq!(a.committed_value, Some(9_000));
    }

    #[test]
    fn test_plus_two_and_dnf_values() {
        let rules = MatchRules::default();
        let mut a = attempt();
        run_to_pending(&mut a, &rules, 9_000);
        a.confirm(Penalty::PlusTwo, &rules).unwrap();
        assert_eq!(a.committed_value, Some(11_000));

        let mut b = attempt();
        run_to_pending(&mut b, &rules, 9_000);
        b.confirm(Penalty::Dnf, &rules).unwrap();
        assert!(b.is_dnf());
        assert_eq!(b.elapsed_ms, Some(9_000));
    }

    #[test]
    fn test_arm_requires_hold() {
        let rules = MatchRules::default();
        let mut a = attempt();
        a.begin_prep(Moment::at(0), &rules).unwrap();
        assert!(a.arm_and_start(Moment::at(500), &rules).is_err());

        a.hold(true, Moment::at(1_000)).unwrap();
        assert!(a.arm_and_start(Moment::at(1_299), &rules).is_err());

        // Releasing resets the hold
        a.hold(false, Moment::at(1_200)).unwrap();
        a.hold(true, Moment::at(1_250)).unwrap();
        assert!(a.arm_and_start(Moment::at(1_500), &rules).is_err());
        a.arm_and_start(Moment::at(1_550), &rules).unwrap();
        assert_eq!(a.state, AttemptState::Running);
    }

    #[test]
    fn test_countdown_expiry() {
        let rules = MatchRules::default();
        let mut a = attempt();
        a.begin_prep(Moment::at(100), &rules).unwrap();
        assert_eq!(a.remaining_prep_ms(Moment::at(5_100)), Some(10_000));
        assert!(!a.prep_expired(Moment::at(15_099)));
        assert!(a.prep_expired(Moment::at(15_100)));

        a.hold(true, Moment::at(14_000)).unwrap();
        assert!(a.arm_and_start(Moment::at(15_200), &rules).is_err());

        a.expire().unwrap();
        assert!(a.is_dnf());
        assert_eq!(a.remaining_prep_ms(Moment::at(15_200)), None);
    }

    #[test]
    fn test_stop_rejects_implausible_time() {
        let rules = MatchRules::default();
        let mut a = attempt();
        a.begin_prep(Moment::at(0), &rules).unwrap();
        a.hold(true, Moment::at(0)).unwrap();
        a.arm_and_start(Moment::at(300), &rules).unwrap();

        assert!(a.stop(0, Moment::at(10_300), &rules).is_err());
        assert!(a.stop(5_000, Moment::at(10_300), &rules).is_err());
        assert_eq!(a.state, AttemptState::Running);
        a.stop(9_800, Moment::at(10_300), &rules).unwrap();
    }

    #[test]
    fn test_out_of_order_intents() {
        let rules = MatchRules::default();
        let mut a = attempt();
        assert!(a.confirm(Penalty::None, &rules).is_err());
        assert!(a.stop(1_000, Moment::at(0), &rules).is_err());
        assert!(a.hold(true, Moment::at(0)).is_err());
        a.begin_prep(Moment::at(0), &rules).unwrap();
        assert!(a.begin_prep(Moment::at(1), &rules).is_err());
    }

    #[test]
    fn test_out_of_range_result_is_committed_as_dnf() {
        let rules = MatchRules {
            max_result_ms: 10_000,
            stop_tolerance_ms: None,
            ..MatchRules::default()
        };
        let mut a = attempt();
        run_to_pending(&mut a, &rules, 9_000);
        let err = a.confirm(Penalty::PlusTwo, &rules).unwrap_err();
        assert_eq!(err.code(), "InvalidState");
        assert!(err.to_string().contains("11000ms"), "{}", err);
        assert!(a.is_dnf());
    }

    #[test]
    fn test_interrupt_lifts_stop_bound() {
        let rules = MatchRules::default();
        let mut a = attempt();
        a.begin_prep(Moment::at(0), &rules).unwrap();
        a.hold(true, Moment::at(0)).unwrap();
        a.arm_and_start(Moment::at(300), &rules).unwrap();
        assert!(a.stop(9_000, Moment::at(60_300), &rules).is_err());

        a.interrupt();
        a.stop(9_000, Moment::at(60_300), &rules).unwrap();
        assert_eq!(a.state, AttemptState::PendingResult);
    }

    #[test]
    fn test_forfeit_from_any_open_state() {
        let rules = MatchRules::default();
        let mut idle = attempt();
        idle.forfeit().unwrap();
        assert!(idle.is_dnf());
        assert!(idle.forfeit().is_err());

        let mut pending = attempt();
        run_to_pending(&mut pending, &rules, 40_000);
        pending.forfeit().unwrap();
        assert!(pending.is_dnf());
        assert_eq!(pending.committed_value, None);
    }
}
