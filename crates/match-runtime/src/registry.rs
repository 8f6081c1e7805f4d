//! Session Registry
//!
//! Maps `sessionId` to the room actor that owns it. A join for an unknown
//! session opens a room; a room that empties out is dropped again.

use std::sync::Arc;

use dashmap::DashMap;
use match_core::{
    Intent, MatchError, MatchRules, Mode, ParticipantId, RandomScrambler, ScrambleSource, Session,
    SessionId, SessionSnapshot,
};
use tokio::sync::broadcast;

use crate::{
    config::RuntimeConfig,
    error::RuntimeError,
    gateway::RoomEvent,
    room::{RoomActor, RoomHandle, RoomSummary},
};

/// Builds the scramble source for a new session
pub type ScrambleFactory = Arc<dyn Fn(&MatchRules) -> Box<dyn ScrambleSource> + Send + Sync>;

/// All live sessions
pub struct SessionRegistry {
    rooms: Arc<DashMap<SessionId, RoomHandle>>,
    config: RuntimeConfig,
    scrambles: ScrambleFactory,
}

impl SessionRegistry {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            config,
            scrambles: Arc::new(|rules: &MatchRules| -> Box<dyn ScrambleSource> {
                Box::new(RandomScrambler::new(rules.puzzle))
            }),
        }
    }

    /// Replace the scramble source used for new sessions
    pub fn with_scrambles<F>(mut self, factory: F) -> Self
    where
        F: Fn(&MatchRules) -> Box<dyn ScrambleSource> + Send + Sync + 'static,
    {
        self.scrambles = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Live room for a session
    pub fn get(&self, session_id: &str) -> Option<RoomHandle> {
        self.rooms
            .get(session_id)
            .map(|h| h.clone())
            .filter(|h| !h.is_closed())
    }

    /// Room for a session, opening one in `mode` if none is live
    pub fn open(&self, session_id: &str, mode: Mode) -> RoomHandle {
        let mut slot = self
            .rooms
            .entry(session_id.to_string())
            .or_insert_with(|| self.spawn_room(session_id, mode));
        if slot.is_closed() {
            *slot = self.spawn_room(session_id, mode);
        }
        slot.clone()
    }

    /// Route an intent to its session. Joins open the session on demand.
    pub async fn submit(
        &self,
        session_id: &str,
        participant_id: impl Into<ParticipantId>,
        intent: Intent,
    ) -> Result<(), RuntimeError> {
        if matches!(intent, Intent::Join { .. }) {
            return self.join(session_id, participant_id, intent).await.map(|_| ());
        }
        let room = self
            .get(session_id)
            .ok_or_else(|| RuntimeError::UnknownSession(session_id.to_string()))?;
        room.submit(participant_id, intent).await
    }

    /// Seat a participant and subscribe to the room that seated them.
    ///
    /// The receiver starts with the join's own events.
    pub async fn join(
        &self,
        session_id: &str,
        participant_id: impl Into<ParticipantId>,
        intent: Intent,
    ) -> Result<(RoomHandle, broadcast::Receiver<RoomEvent>), RuntimeError> {
        let Intent::Join { mode, .. } = &intent else {
            return Err(MatchError::invalid(format!("{} is not a join", intent.name())).into());
        };
        let mode = mode.unwrap_or(self.config.default_mode);
        let participant_id = participant_id.into();

        match self.join_once(session_id, mode, &participant_id, intent.clone()).await {
            // The room emptied out between lookup and send; start a fresh one
            Err(RuntimeError::RoomClosed(_)) => {
                self.join_once(session_id, mode, &participant_id, intent).await
            }
            other => other,
        }
    }

    async fn join_once(
        &self,
        session_id: &str,
        mode: Mode,
        participant_id: &str,
        intent: Intent,
    ) -> Result<(RoomHandle, broadcast::Receiver<RoomEvent>), RuntimeError> {
        let room = self.open(session_id, mode);
        let events = room.subscribe().await?;
        room.submit(participant_id, intent).await?;
        Ok((room, events))
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, RuntimeError> {
        self.get(session_id)
            .ok_or_else(|| RuntimeError::UnknownSession(session_id.to_string()))?
            .snapshot()
            .await
    }

    /// Summaries of every live room, ordered by session id
    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut summaries: Vec<RoomSummary> = self
            .rooms
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| entry.value().summary())
            .collect();
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        summaries
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Stop every room
    pub async fn shutdown(&self) {
        let rooms: Vec<RoomHandle> = self.rooms.iter().map(|e| e.value().clone()).collect();
        tracing::info!("Shutting down {} rooms", rooms.len());
        for room in rooms {
            room.shutdown().await;
        }
    }

    fn spawn_room(&self, session_id: &str, mode: Mode) -> RoomHandle {
        let session = Session::new(
            session_id,
            mode,
            self.config.rules.clone(),
            (self.scrambles)(&self.config.rules),
        );
        let (handle, task) = RoomActor::spawn(session, &self.config);

        let rooms = self.rooms.clone();
        let watched = handle.clone();
        let id = session_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!("Room {} task failed: {}", id, e);
            }
            // A newer room may already hold this id
            if rooms.remove_if(&id, |_, h| h.same_room(&watched)).is_some() {
                tracing::info!("Session {} removed from registry", id);
            }
        });

        tracing::info!("Session {} created ({:?})", session_id, mode);
        handle
    }
}
