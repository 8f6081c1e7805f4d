//! Session
//!
//! One match instance and the only place its state changes. The owning
//! actor feeds intents and ticks in one at a time; events produced along
//! the way are queued and drained with [`Session::take_events`].
//!
//! A rejected intent returns an error and queues nothing, with one
//! exception: a confirm whose value fails validation is still committed
//! (as DNF) and the turn advances before the error is returned.

use serde::{Deserialize, Serialize};

use crate::{
    error::MatchError,
    event::MatchEvent,
    intent::Intent,
    rematch::{CancelReason, RematchRequest},
    rules::MatchRules,
    scoring::{self, Outcome, ScoreSheet},
    scramble::ScrambleSource,
    solve::SolveAttempt,
    state::{AttemptState, Lifecycle, Mode, Moment, Participant, ParticipantId, Penalty, Seat, SessionId, Team},
    termination::{self, LockVerdict},
    turn::TurnOrder,
};

/// Read model of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub mode: Mode,
    pub lifecycle: Lifecycle,
    pub round_count: usize,
    pub current_round: usize,
    pub holder_id: Option<ParticipantId>,
    pub participants: Vec<Participant>,
    pub scrambles: Vec<String>,
    pub in_flight: Option<SolveAttempt>,
    pub attempts: Vec<SolveAttempt>,
    pub rematch: Option<RematchRequest>,
    pub verdict: Option<LockVerdict>,
    pub scores: ScoreSheet,
}

/// A match between 2 (duel) or 4 (squad) participants
pub struct Session {
    id: SessionId,
    mode: Mode,
    rules: MatchRules,
    lifecycle: Lifecycle,
    /// Join order
    participants: Vec<Participant>,
    next_join_seq: u64,
    turn_order: TurnOrder,
    current_round: usize,
    /// Commits so far in the current round
    turn_index: usize,
    scrambles: Vec<String>,
    dispenser: Box<dyn ScrambleSource>,
    /// The holder's attempt. At most one attempt is ever open.
    in_flight: Option<SolveAttempt>,
    committed: Vec<SolveAttempt>,
    rematch: Option<RematchRequest>,
    verdict: Option<LockVerdict>,
    outcome: Option<Outcome>,
    outbox: Vec<MatchEvent>,
}

impl Session {
    /// Create a session in Forming
    pub fn new(
        id: impl Into<SessionId>,
        mode: Mode,
        rules: MatchRules,
        dispenser: Box<dyn ScrambleSource>,
    ) -> Self {
        Self {
            id: id.into(),
            mode,
            rules,
            lifecycle: Lifecycle::Forming,
            participants: Vec::new(),
            next_join_seq: 0,
            turn_order: TurnOrder::new(mode, Seat::solo(0)),
            current_round: 0,
            turn_index: 0,
            scrambles: Vec::new(),
            dispenser,
            in_flight: None,
            committed: Vec::new(),
            rematch: None,
            verdict: None,
            outcome: None,
            outbox: Vec::new(),
        }
    }

    // ============ Accessors ============

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, participant_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.participant_id == participant_id)
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }

    /// Scramble dispensed for `round`, if any
    pub fn scramble(&self, round: usize) -> Option<&str> {
        self.scrambles.get(round).map(String::as_str)
    }

    pub fn committed(&self) -> &[SolveAttempt] {
        &self.committed
    }

    pub fn in_flight(&self) -> Option<&SolveAttempt> {
        self.in_flight.as_ref()
    }

    pub fn rematch(&self) -> Option<&RematchRequest> {
        self.rematch.as_ref()
    }

    pub fn verdict(&self) -> Option<&LockVerdict> {
        self.verdict.as_ref()
    }

    /// Final or provisional result once the match is over
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Participant who currently owns the timer
    pub fn current_holder(&self) -> Option<&Participant> {
        if self.lifecycle != Lifecycle::Active {
            return None;
        }
        let seat = self.turn_order.seat_at(self.turn_index)?;
        self.participants.iter().find(|p| p.seat == seat)
    }

    /// Whether the actor should keep ticking this session
    pub fn needs_ticks(&self) -> bool {
        self.lifecycle == Lifecycle::Active
            && (self.scrambles.len() <= self.current_round
                || self
                    .in_flight
                    .as_ref()
                    .is_some_and(|a| a.state == AttemptState::Preparing))
    }

    pub fn scores(&self) -> ScoreSheet {
        scoring::compute(self.mode, &self.committed)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            mode: self.mode,
            lifecycle: self.lifecycle,
            round_count: self.rules.round_count,
            current_round: self.current_round,
            holder_id: self.current_holder().map(|p| p.participant_id.clone()),
            participants: self.participants.clone(),
            scrambles: self.scrambles.clone(),
            in_flight: self.in_flight.clone(),
            attempts: self.committed.clone(),
            rematch: self.rematch.clone(),
            verdict: self.verdict,
            scores: self.scores(),
        }
    }

    /// Drain queued events in emission order
    pub fn take_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, event: MatchEvent) {
        self.outbox.push(event);
    }

    fn transition(&mut self, next: Lifecycle) -> Result<(), MatchError> {
        self.lifecycle = self.lifecycle.transition(next)?;
        Ok(())
    }

    // ============ Dispatch ============

    /// Apply one intent from `participant_id`
    pub fn apply(&mut self, participant_id: &str, intent: Intent, now: Moment) -> Result<(), MatchError> {
        match intent {
            Intent::Join {
                display_name,
                mode,
                team,
                position,
            } => self.join(participant_id, &display_name, mode, team, position),
            Intent::Leave => self.leave(participant_id),
            Intent::BeginPrep => self.begin_prep(participant_id, now),
            Intent::Hold { pressed } => self.hold(participant_id, pressed, now),
            Intent::ArmAndStart => self.arm_and_start(participant_id, now),
            Intent::Stop { elapsed_ms } => self.stop(participant_id, elapsed_ms, now),
            Intent::Confirm { penalty } => self.confirm(participant_id, penalty),
            Intent::RequestRematch => self.request_rematch(participant_id),
            Intent::RespondRematch { accept } => self.respond_rematch(participant_id, accept),
            Intent::CancelRematch => self.cancel_rematch(participant_id),
        }
    }

    // ============ Roster ============

    /// Seat a participant. Re-joining an existing seat just re-sends the roster.
    pub fn join(
        &mut self,
        participant_id: &str,
        display_name: &str,
        mode: Option<Mode>,
        team: Option<Team>,
        position: Option<u8>,
    ) -> Result<(), MatchError> {
        if mode.is_some_and(|m| m != self.mode) {
            return Err(MatchError::ModeMismatch);
        }

        if let Some(existing) = self
            .participants
            .iter_mut()
            .find(|p| p.participant_id == participant_id)
        {
            existing.display_name = display_name.to_string();
            self.emit_roster();
            return Ok(());
        }

        if self.participants.len() >= self.mode.quorum() {
            return Err(MatchError::SessionFull);
        }

        let seat = self.pick_seat(team, position)?;
        let is_host = self.participants.is_empty();
        self.participants.push(Participant {
            participant_id: participant_id.to_string(),
            display_name: display_name.to_string(),
            seat,
            is_host,
            joined_seq: self.next_join_seq,
        });
        self.next_join_seq += 1;

        tracing::debug!(
            "Session {}: {} joined seat {:?} (host: {})",
            self.id,
            participant_id,
            seat,
            is_host
        );

        if self.participants.len() < self.mode.quorum() || !self.seats_complete() {
            self.emit_roster();
            return Ok(());
        }

        match self.lifecycle {
            Lifecycle::Forming => self.activate(),
            Lifecycle::Suspended { .. } => self.resume(),
            _ => {
                self.emit_roster();
                Ok(())
            }
        }
    }

    /// Remove a participant, handing over host and suspending if quorum is lost
    pub fn leave(&mut self, participant_id: &str) -> Result<(), MatchError> {
        let index = self
            .participants
            .iter()
            .position(|p| p.participant_id == participant_id)
            .ok_or(MatchError::UnknownParticipant)?;
        let leaving = self.participants.remove(index);

        if leaving.is_host {
            if let Some(next) = self.participants.iter_mut().min_by_key(|p| p.joined_seq) {
                next.is_host = true;
                tracing::info!("Session {}: host passed to {}", self.id, next.participant_id);
            }
        }

        if let Some(request) = self.rematch.take() {
            self.lifecycle = request.prior;
            self.emit(MatchEvent::RematchCancelled {
                reason: CancelReason::ParticipantLeft {
                    participant_id: participant_id.to_string(),
                },
            });
        }

        let present = self.participants.len();
        let required = self.mode.quorum();
        if present < required {
            if let Some(suspended) = self.lifecycle.suspended() {
                self.transition(suspended)?;
                tracing::info!(
                    "Session {} suspended: {} left ({}/{})",
                    self.id,
                    participant_id,
                    present,
                    required
                );
                self.emit_roster();
                self.emit(MatchEvent::Suspended { present, required });
                return Ok(());
            }
        }

        self.emit_roster();
        Ok(())
    }

    fn emit_roster(&mut self) {
        self.emit(MatchEvent::Roster {
            participants: self.participants.clone(),
            lifecycle: self.lifecycle,
        });
    }

    fn seat_taken(&self, seat: Seat) -> bool {
        self.participants.iter().any(|p| p.seat == seat)
    }

    fn seats_complete(&self) -> bool {
        self.mode.seats().into_iter().all(|seat| self.seat_taken(seat))
    }

    fn first_free(&self, candidates: Vec<Seat>) -> Option<Seat> {
        candidates.into_iter().find(|seat| !self.seat_taken(*seat))
    }

    fn pick_seat(&self, team: Option<Team>, position: Option<u8>) -> Result<Seat, MatchError> {
        if position.is_some_and(|p| p > 1) {
            return Err(MatchError::InvalidSeat("position must be 0 or 1".to_string()));
        }

        let seat = match (self.mode, team, position) {
            (Mode::Duel, Some(_), _) => {
                return Err(MatchError::InvalidSeat("duel seats have no team".to_string()))
            }
            (Mode::Duel, None, Some(slot)) => Seat::solo(slot),
            (Mode::Squad, Some(team), Some(slot)) => Seat::team(team, slot),
            (Mode::Squad, Some(team), None) => self
                .first_free(vec![Seat::team(team, 0), Seat::team(team, 1)])
                .ok_or(MatchError::SeatTaken)?,
            (Mode::Squad, None, Some(_)) => {
                return Err(MatchError::InvalidSeat("position requires a team".to_string()))
            }
            (_, None, None) => self
                .first_free(self.mode.seats())
                .ok_or(MatchError::SessionFull)?,
        };

        if self.seat_taken(seat) {
            return Err(MatchError::SeatTaken);
        }
        Ok(seat)
    }

    fn activate(&mut self) -> Result<(), MatchError> {
        let host_seat = self
            .host()
            .map(|p| p.seat)
            .ok_or_else(|| MatchError::invalid("session has no host"))?;
        self.turn_order = TurnOrder::new(self.mode, host_seat);
        self.transition(Lifecycle::Active)?;
        tracing::info!(
            "Session {} active: {:?} with {} participants",
            self.id,
            self.mode,
            self.participants.len()
        );
        self.emit_roster();
        self.open_round();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), MatchError> {
        let Lifecycle::Suspended { resume_to } = self.lifecycle else {
            return Err(MatchError::invalid("session is not suspended"));
        };
        self.transition(resume_to.into())?;
        tracing::info!("Session {} resumed as {:?}", self.id, self.lifecycle);
        self.emit_roster();
        self.emit(MatchEvent::Resumed {
            lifecycle: self.lifecycle,
        });

        if self.lifecycle != Lifecycle::Active {
            return Ok(());
        }
        if self.forfeit_orphaned_attempt() {
            return self.commit_in_flight();
        }
        if let Some(scramble) = self.scrambles.get(self.current_round).cloned() {
            self.emit(MatchEvent::RoundStarted {
                round: self.current_round,
                scramble,
            });
        }
        self.resume_turn();
        Ok(())
    }

    /// A started attempt whose owner gave up the seat is spent: the
    /// scramble has been seen. Returns true if it was forced to DNF.
    fn forfeit_orphaned_attempt(&mut self) -> bool {
        let holder = self.current_holder().map(|p| p.participant_id.clone());
        let Some(attempt) = self.in_flight.as_mut() else {
            return false;
        };
        if Some(&attempt.participant_id) == holder.as_ref() || attempt.state == AttemptState::Idle {
            return false;
        }
        if attempt.forfeit().is_err() {
            return false;
        }
        tracing::info!(
            "Session {}: {} gave up the seat mid-attempt, DNF",
            self.id,
            attempt.participant_id
        );
        true
    }

    /// Re-announce the holder. Their attempt carries on where it stopped.
    fn resume_turn(&mut self) {
        let holder = self.current_holder().map(|p| p.participant_id.clone());
        let owned = match self.in_flight.as_mut() {
            Some(attempt) if Some(&attempt.participant_id) == holder.as_ref() => {
                attempt.interrupt();
                true
            }
            _ => false,
        };
        match holder {
            Some(next_holder_id) if owned => self.emit(MatchEvent::TurnChanged {
                next_holder_id,
                round: self.current_round,
            }),
            _ => self.open_turn(),
        }
    }

    // ============ Turns ============

    /// Dispense the current round's scramble if needed, then open the turn
    fn open_round(&mut self) {
        if !self.dispense() {
            tracing::warn!(
                "Session {}: no scramble available for round {}",
                self.id,
                self.current_round
            );
        }
        self.open_turn();
    }

    /// Make sure the current round has a scramble. Returns false if the
    /// dispenser has none to give.
    fn dispense(&mut self) -> bool {
        if self.scrambles.len() > self.current_round {
            return true;
        }
        let Some(scramble) = self.dispenser.next_scramble() else {
            return false;
        };
        self.scrambles.push(scramble.clone());
        self.emit(MatchEvent::RoundStarted {
            round: self.current_round,
            scramble,
        });
        true
    }

    /// Announce the holder and give them a fresh attempt
    fn open_turn(&mut self) {
        self.in_flight = None;
        let Some(holder) = self.current_holder().map(|p| p.participant_id.clone()) else {
            return;
        };
        self.emit(MatchEvent::TurnChanged {
            next_holder_id: holder,
            round: self.current_round,
        });
        self.ensure_attempt();
    }

    fn ensure_attempt(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(holder) = self.current_holder() else {
            return;
        };
        let (participant_id, seat) = (holder.participant_id.clone(), holder.seat);
        if let Some(scramble) = self.scrambles.get(self.current_round) {
            self.in_flight = Some(SolveAttempt::new(
                participant_id,
                seat,
                self.current_round,
                scramble.clone(),
            ));
        }
    }

    /// Guard shared by every solve intent
    fn check_holder(&self, participant_id: &str) -> Result<(), MatchError> {
        if self.participant(participant_id).is_none() {
            return Err(MatchError::UnknownParticipant);
        }
        match self.lifecycle {
            Lifecycle::Active => {}
            Lifecycle::Suspended { .. } => return Err(MatchError::QuorumLost),
            other => {
                return Err(MatchError::invalid(format!("no solves while {:?}", other)));
            }
        }
        let is_holder = self
            .current_holder()
            .is_some_and(|p| p.participant_id == participant_id);
        if !is_holder {
            return Err(MatchError::OutOfTurn);
        }
        if self.in_flight.is_none() {
            return Err(MatchError::NotReady);
        }
        Ok(())
    }

    fn holder_attempt(&mut self, participant_id: &str) -> Result<&mut SolveAttempt, MatchError> {
        self.check_holder(participant_id)?;
        self.in_flight.as_mut().ok_or(MatchError::NotReady)
    }

    // ============ Solve intents ============

    pub fn begin_prep(&mut self, participant_id: &str, now: Moment) -> Result<(), MatchError> {
        let rules = self.rules.clone();
        self.holder_attempt(participant_id)?.begin_prep(now, &rules)?;
        tracing::debug!("Session {}: {} preparing", self.id, participant_id);
        self.emit(MatchEvent::PrepTick {
            participant_id: participant_id.to_string(),
            remaining_ms: rules.prep_duration_ms,
        });
        Ok(())
    }

    pub fn hold(&mut self, participant_id: &str, pressed: bool, now: Moment) -> Result<(), MatchError> {
        self.holder_attempt(participant_id)?.hold(pressed, now)
    }

    pub fn arm_and_start(&mut self, participant_id: &str, now: Moment) -> Result<(), MatchError> {
        let rules = self.rules.clone();
        self.holder_attempt(participant_id)?.arm_and_start(now, &rules)?;
        tracing::debug!("Session {}: {} started", self.id, participant_id);
        self.emit(MatchEvent::Started {
            participant_id: participant_id.to_string(),
            start_ts: now.unix_ms,
        });
        Ok(())
    }

    pub fn stop(&mut self, participant_id: &str, elapsed_ms: u64, now: Moment) -> Result<(), MatchError> {
        let rules = self.rules.clone();
        self.holder_attempt(participant_id)?.stop(elapsed_ms, now, &rules)?;
        self.emit(MatchEvent::PendingResult {
            participant_id: participant_id.to_string(),
            elapsed_ms,
        });
        Ok(())
    }

    pub fn confirm(&mut self, participant_id: &str, penalty: Penalty) -> Result<(), MatchError> {
        let rules = self.rules.clone();
        let attempt = self.holder_attempt(participant_id)?;
        let result = attempt.confirm(penalty, &rules);
        if attempt.state == AttemptState::Committed {
            if let Err(e) = &result {
                tracing::warn!("Session {}: {} result discarded: {}", self.id, participant_id, e);
            }
            self.commit_in_flight()?;
        }
        result
    }

    /// Drive the preparation countdown. Forces a DNF once it runs out.
    pub fn tick(&mut self, now: Moment) -> Result<(), MatchError> {
        if self.lifecycle != Lifecycle::Active {
            return Ok(());
        }
        if self.in_flight.is_none() && self.dispense() {
            self.ensure_attempt();
        }

        let Some(attempt) = self.in_flight.as_mut() else {
            return Ok(());
        };
        match attempt.remaining_prep_ms(now) {
            Some(0) => {
                attempt.expire()?;
                tracing::info!(
                    "Session {}: {} ran out of preparation time, DNF",
                    self.id,
                    attempt.participant_id
                );
                self.commit_in_flight()
            }
            Some(remaining_ms) => {
                let participant_id = attempt.participant_id.clone();
                self.emit(MatchEvent::PrepTick {
                    participant_id,
                    remaining_ms,
                });
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Record the committed attempt and move the turn on
    fn commit_in_flight(&mut self) -> Result<(), MatchError> {
        let Some(attempt) = self.in_flight.take() else {
            return Ok(());
        };
        self.emit(MatchEvent::Committed {
            participant_id: attempt.participant_id.clone(),
            round: attempt.round,
            committed_value: attempt.committed_value,
            penalty: attempt.penalty,
        });
        self.committed.push(attempt);
        self.turn_index += 1;

        if let Some(verdict) = termination::evaluate(self.mode, &self.rules, &self.committed) {
            return self.lock(verdict);
        }

        if self.turn_index >= self.turn_order.len() {
            self.turn_index = 0;
            self.current_round += 1;
            if self.current_round >= self.rules.round_count {
                return self.conclude();
            }
            self.open_round();
        } else {
            self.open_turn();
        }
        Ok(())
    }

    fn lock(&mut self, verdict: LockVerdict) -> Result<(), MatchError> {
        self.transition(Lifecycle::Locked)?;
        self.in_flight = None;
        self.verdict = Some(verdict);
        self.outcome = Some(verdict.outcome);
        tracing::info!("Session {} locked: {:?}", self.id, verdict.reason);
        self.emit(MatchEvent::Locked {
            reason: verdict.reason,
            winner_side: verdict.outcome.winner(),
        });
        Ok(())
    }

    fn conclude(&mut self) -> Result<(), MatchError> {
        self.transition(Lifecycle::Concluded)?;
        self.in_flight = None;
        let scores = self.scores();
        self.outcome = Some(scores.outcome);
        tracing::info!("Session {} concluded: {:?}", self.id, scores.outcome);
        self.emit(MatchEvent::Concluded {
            outcome: scores.outcome,
            scores,
        });
        Ok(())
    }

    // ============ Rematch ============

    pub fn request_rematch(&mut self, host_id: &str) -> Result<(), MatchError> {
        let participant = self
            .participant(host_id)
            .ok_or(MatchError::UnknownParticipant)?;
        if !participant.is_host {
            return Err(MatchError::NotHost);
        }
        if !self.lifecycle.is_finished() {
            return Err(MatchError::invalid(format!(
                "rematch not allowed while {:?}",
                self.lifecycle
            )));
        }
        if self.rematch.is_some() {
            return Err(MatchError::invalid("rematch already pending"));
        }

        let request = RematchRequest::open(
            host_id.to_string(),
            self.participants.iter().map(|p| p.participant_id.clone()),
            self.lifecycle,
        );
        tracing::info!("Session {}: rematch requested by {}", self.id, host_id);
        self.emit(MatchEvent::RematchOpened {
            participants: request.participants.iter().cloned().collect(),
            accepted: request.accepted.iter().cloned().collect(),
        });
        self.rematch = Some(request);
        Ok(())
    }

    pub fn respond_rematch(&mut self, participant_id: &str, accept: bool) -> Result<(), MatchError> {
        let request = self
            .rematch
            .as_mut()
            .ok_or_else(|| MatchError::invalid("no rematch pending"))?;
        if !request.is_eligible(participant_id) {
            return Err(MatchError::NotEligible);
        }

        if !accept {
            return self.drop_rematch(CancelReason::DeclinedBy {
                participant_id: participant_id.to_string(),
            });
        }

        if request.accept(participant_id)? {
            self.reset()
        } else {
            let accepted = request.accepted.iter().cloned().collect();
            self.emit(MatchEvent::RematchUpdated { accepted });
            Ok(())
        }
    }

    pub fn cancel_rematch(&mut self, host_id: &str) -> Result<(), MatchError> {
        let participant = self
            .participant(host_id)
            .ok_or(MatchError::UnknownParticipant)?;
        if !participant.is_host {
            return Err(MatchError::NotHost);
        }
        if self.rematch.is_none() {
            return Err(MatchError::invalid("no rematch pending"));
        }
        self.drop_rematch(CancelReason::CancelledByHost)
    }

    fn drop_rematch(&mut self, reason: CancelReason) -> Result<(), MatchError> {
        let request = self
            .rematch
            .take()
            .ok_or_else(|| MatchError::invalid("no rematch pending"))?;
        self.lifecycle = request.prior;
        tracing::info!("Session {}: rematch dropped ({:?})", self.id, reason);
        self.emit(MatchEvent::RematchCancelled { reason });
        Ok(())
    }

    /// Everyone accepted: wipe results and start over with fresh scrambles
    fn reset(&mut self) -> Result<(), MatchError> {
        self.transition(Lifecycle::Resetting)?;
        self.emit(MatchEvent::RematchConfirmed);

        self.rematch = None;
        self.committed.clear();
        self.scrambles.clear();
        self.in_flight = None;
        self.current_round = 0;
        self.turn_index = 0;
        self.verdict = None;
        self.outcome = None;
        if let Some(host_seat) = self.host().map(|p| p.seat) {
            self.turn_order = TurnOrder::new(self.mode, host_seat);
        }

        self.transition(Lifecycle::Active)?;
        tracing::info!("Session {}: rematch confirmed, match restarted", self.id);
        self.open_round();
        Ok(())
    }
}
