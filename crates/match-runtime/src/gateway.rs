//! Event Gateway - Fans room events out to subscribers
//!
//! Every room instance owns its own broadcast channel, so subscribers see
//! one room's events in the order the actor emitted them. A room that
//! replaces an ended one under the same id starts a fresh channel; old
//! subscribers see `Closed` and never the new room's events.

use match_core::{MatchEvent, SessionId};
use serde::Serialize;
use tokio::sync::broadcast;

/// An event tagged with its room and per-room sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    pub session_id: SessionId,
    /// Starts at 1 and increases by one per event within a room
    pub seq: u64,
    pub event: MatchEvent,
}

/// Outbound side of one room instance
pub struct RoomChannel {
    tx: broadcast::Sender<RoomEvent>,
}

impl RoomChannel {
    /// Create a channel whose subscribers buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish one event. Never blocks.
    pub fn publish(&self, event: RoomEvent) {
        // No subscribers is fine; nobody is watching this room
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }
}
