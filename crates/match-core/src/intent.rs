//! Client Intents
//!
//! Requests a participant can make. The session decides whether to honour
//! them; an intent is never trusted to change state on its own.

use serde::{Deserialize, Serialize};

use crate::state::{Mode, Penalty, Team};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Intent {
    Join {
        display_name: String,
        /// Only honoured for the participant who opens the session
        #[serde(default)]
        mode: Option<Mode>,
        #[serde(default)]
        team: Option<Team>,
        #[serde(default)]
        position: Option<u8>,
    },
    Leave,
    BeginPrep,
    /// Holder is pressing (or released) the timer during Preparing
    Hold { pressed: bool },
    ArmAndStart,
    Stop { elapsed_ms: u64 },
    Confirm {
        #[serde(default)]
        penalty: Penalty,
    },
    RequestRematch,
    RespondRematch { accept: bool },
    CancelRematch,
}

impl Intent {
    /// Wire name of the intent
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Join { .. } => "join",
            Intent::Leave => "leave",
            Intent::BeginPrep => "beginPrep",
            Intent::Hold { .. } => "hold",
            Intent::ArmAndStart => "armAndStart",
            Intent::Stop { .. } => "stop",
            Intent::Confirm { .. } => "confirm",
            Intent::RequestRematch => "requestRematch",
            Intent::RespondRematch { .. } => "respondRematch",
            Intent::CancelRematch => "cancelRematch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intents() {
        let join: Intent = serde_json::from_str(
            r#"{"type":"join","displayName":"Ana","mode":"squad","team":"B","position":1}"#,
        )
        .unwrap();
        assert_eq!(
            join,
            Intent::Join {
                display_name: "Ana".to_string(),
                mode: Some(Mode::Squad),
                team: Some(Team::B),
                position: Some(1),
            }
        );

        let stop: Intent = serde_json::from_str(r#"{"type":"stop","elapsedMs":9123}"#).unwrap();
        assert_eq!(stop, Intent::Stop { elapsed_ms: 9_123 });

        let confirm: Intent = serde_json::from_str(r#"{"type":"confirm"}"#).unwrap();
        assert_eq!(confirm, Intent::Confirm { penalty: Penalty::None });

        let confirm: Intent =
            serde_json::from_str(r#"{"type":"confirm","penalty":"plusTwo"}"#).unwrap();
        assert_eq!(confirm.name(), "confirm");
    }
}
