//! Wire Protocol
//!
//! JSON text frames. Clients send one intent per frame, tagged by `type`
//! and addressed by `sessionId`/`participantId`. The server answers the
//! sender with `ack` or `error` and streams room events as `event`. A
//! client that falls behind the room gets a `resync` carrying the full
//! state; events with a `seq` at or below the resync's are already in it.

use match_core::{Intent, ParticipantId, SessionId, SessionSnapshot};
use match_runtime::{RoomEvent, RuntimeError};
use serde::{Deserialize, Serialize};

/// Inbound frame
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFrame {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    /// Echoed back in the reply
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(flatten)]
    pub intent: Intent,
}

/// Outbound frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Ack {
        request_id: Option<u64>,
        intent: String,
    },
    Error {
        request_id: Option<u64>,
        code: String,
        message: String,
    },
    Event(RoomEvent),
    Resync {
        seq: u64,
        snapshot: SessionSnapshot,
    },
}

impl ServerMessage {
    pub fn ack(request_id: Option<u64>, intent: &str) -> Self {
        ServerMessage::Ack {
            request_id,
            intent: intent.to_string(),
        }
    }

    pub fn error(request_id: Option<u64>, code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            request_id,
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Error reply for a rejected intent
    pub fn rejected(request_id: Option<u64>, error: &RuntimeError) -> Self {
        Self::error(request_id, error.code(), error.to_string())
    }
}
