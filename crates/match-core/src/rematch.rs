//! Rematch Consensus
//!
//! Unanimous approval among the quorum present when the host asked.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::MatchError,
    state::{Lifecycle, ParticipantId},
};

/// Why a rematch request was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CancelReason {
    DeclinedBy { participant_id: ParticipantId },
    CancelledByHost,
    ParticipantLeft { participant_id: ParticipantId },
}

/// Pending rematch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RematchRequest {
    pub initiator_id: ParticipantId,
    pub participants: BTreeSet<ParticipantId>,
    pub accepted: BTreeSet<ParticipantId>,
    /// Lifecycle to restore if the request is dropped
    pub prior: Lifecycle,
}

impl RematchRequest {
    /// Open a request; the initiating host counts as accepted
    pub fn open<I>(initiator_id: ParticipantId, participants: I, prior: Lifecycle) -> Self
    where
        I: IntoIterator<Item = ParticipantId>,
    {
        let participants: BTreeSet<ParticipantId> = participants.into_iter().collect();
        let mut accepted = BTreeSet::new();
        accepted.insert(initiator_id.clone());
        Self {
            initiator_id,
            participants,
            accepted,
            prior,
        }
    }

    pub fn is_eligible(&self, participant_id: &str) -> bool {
        self.participants.contains(participant_id)
    }

    /// Record an acceptance. Returns true once everyone has accepted.
    pub fn accept(&mut self, participant_id: &str) -> Result<bool, MatchError> {
        if !self.is_eligible(participant_id) {
            return Err(MatchError::NotEligible);
        }
        self.accepted.insert(participant_id.to_string());
        Ok(self.is_unanimous())
    }

    pub fn is_unanimous(&self) -> bool {
        self.accepted == self.participants
    }

    /// Participants who have not answered yet
    pub fn waiting_on(&self) -> Vec<ParticipantId> {
        self.participants.difference(&self.accepted).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RematchRequest {
        RematchRequest::open(
            "host".to_string(),
            ["host", "b", "c", "d"].map(String::from),
            Lifecycle::Concluded,
        )
    }

    #[test]
    fn test_host_is_auto_accepted() {
        let req = request();
        assert!(req.accepted.contains("host"));
        assert!(!req.is_unanimous());
        assert_eq!(req.waiting_on(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_unanimity() {
        let mut req = request();
        assert!(!req.accept("b").unwrap());
        assert!(!req.accept("b").unwrap());
        assert!(!req.accept("c").unwrap());
        assert!(req.accept("d").unwrap());
    }

    #[test]
    fn test_outsider_cannot_accept() {
        let mut req = request();
        assert_eq!(req.accept("spectator"), Err(MatchError::NotEligible));
        assert_eq!(req.accepted.len(), 1);
    }
}
