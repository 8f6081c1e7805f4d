//! Match Events
//!
//! Authoritative events emitted by a session, in emission order. Every
//! room member receives the same sequence.

use serde::{Deserialize, Serialize};

use crate::{
    rematch::CancelReason,
    scoring::{Outcome, ScoreSheet},
    state::{Lifecycle, Participant, ParticipantId, Penalty, Side},
    termination::LockReason,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MatchEvent {
    /// Current roster after a join or leave
    Roster {
        participants: Vec<Participant>,
        lifecycle: Lifecycle,
    },

    /// Scramble for a round has been dispensed
    RoundStarted { round: usize, scramble: String },

    /// A new holder owns the timer
    TurnChanged {
        next_holder_id: ParticipantId,
        round: usize,
    },

    /// Server-owned preparation countdown
    PrepTick {
        participant_id: ParticipantId,
        remaining_ms: u64,
    },

    Started {
        participant_id: ParticipantId,
        /// Unix millis
        start_ts: i64,
    },

    PendingResult {
        participant_id: ParticipantId,
        elapsed_ms: u64,
    },

    Committed {
        participant_id: ParticipantId,
        round: usize,
        /// `None` is a DNF
        committed_value: Option<u64>,
        penalty: Penalty,
    },

    /// Repeated-DNF lock
    Locked {
        reason: LockReason,
        winner_side: Option<Side>,
    },

    /// Last round finished
    Concluded { outcome: Outcome, scores: ScoreSheet },

    /// Quorum lost; results are kept
    Suspended { present: usize, required: usize },

    /// Quorum restored
    Resumed { lifecycle: Lifecycle },

    RematchOpened {
        participants: Vec<ParticipantId>,
        accepted: Vec<ParticipantId>,
    },

    RematchUpdated { accepted: Vec<ParticipantId> },

    RematchConfirmed,

    RematchCancelled { reason: CancelReason },
}

impl MatchEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            MatchEvent::Roster { .. } => "roster",
            MatchEvent::RoundStarted { .. } => "roundStarted",
            MatchEvent::TurnChanged { .. } => "turnChanged",
            MatchEvent::PrepTick { .. } => "prepTick",
            MatchEvent::Started { .. } => "started",
            MatchEvent::PendingResult { .. } => "pendingResult",
            MatchEvent::Committed { .. } => "committed",
            MatchEvent::Locked { .. } => "locked",
            MatchEvent::Concluded { .. } => "concluded",
            MatchEvent::Suspended { .. } => "suspended",
            MatchEvent::Resumed { .. } => "resumed",
            MatchEvent::RematchOpened { .. } => "rematchOpened",
            MatchEvent::RematchUpdated { .. } => "rematchUpdated",
            MatchEvent::RematchConfirmed => "rematchConfirmed",
            MatchEvent::RematchCancelled { .. } => "rematchCancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_tags() {
        let events = vec![
            MatchEvent::PrepTick {
                participant_id: "a".to_string(),
                remaining_ms: 15_000,
            },
            MatchEvent::Committed {
                participant_id: "a".to_string(),
                round: 3,
                committed_value: None,
                penalty: Penalty::Dnf,
            },
            MatchEvent::RematchConfirmed,
            MatchEvent::RematchCancelled {
                reason: CancelReason::CancelledByHost,
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.name());
        }
    }

    #[test]
    fn test_committed_dnf_is_null() {
        let json = serde_json::to_value(MatchEvent::Committed {
            participant_id: "a".to_string(),
            round: 1,
            committed_value: None,
            penalty: Penalty::Dnf,
        })
        .unwrap();
        assert!(json["committedValue"].is_null());
        assert_eq!(json["participantId"], "a");
    }
}
