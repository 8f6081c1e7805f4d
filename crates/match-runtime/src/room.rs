//! Room Actor - Single writer for one session
//!
//! Every intent for a session goes through the room's command channel and
//! is applied in arrival order by one task. The same task drives the
//! preparation countdown, so expiry never depends on a client. Events
//! go out on the room's own channel, which closes when the actor stops.

use std::{sync::Arc, time::Duration};

use match_core::{
    Intent, Lifecycle, MatchError, Mode, Moment, ParticipantId, Session, SessionId, SessionSnapshot,
};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    config::RuntimeConfig,
    error::RuntimeError,
    gateway::{RoomChannel, RoomEvent},
};

/// Commands accepted by a room
pub enum RoomCommand {
    Intent {
        participant_id: ParticipantId,
        intent: Intent,
        reply: oneshot::Sender<Result<(), MatchError>>,
    },
    /// Read model together with the seq of the last event it reflects
    Snapshot {
        reply: oneshot::Sender<(u64, SessionSnapshot)>,
    },
    /// Receive every event published after this command
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<RoomEvent>>,
    },
    Shutdown,
}

/// Lightweight view of a room, readable without going through the actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub session_id: SessionId,
    pub mode: Mode,
    pub lifecycle: Lifecycle,
    pub participants: usize,
    pub current_round: usize,
    pub holder_id: Option<ParticipantId>,
    /// Unix millis of the last change
    pub updated_at: i64,
}

impl RoomSummary {
    fn of(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            mode: session.mode(),
            lifecycle: session.lifecycle(),
            participants: session.participants().len(),
            current_round: session.current_round(),
            holder_id: session.current_holder().map(|p| p.participant_id.clone()),
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Handle for talking to a room
#[derive(Clone, Debug)]
pub struct RoomHandle {
    session_id: SessionId,
    commands: mpsc::Sender<RoomCommand>,
    summary: Arc<RwLock<RoomSummary>>,
}

impl RoomHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Submit an intent and wait for the verdict.
    ///
    /// Events caused by the intent are published before this returns.
    pub async fn submit(
        &self,
        participant_id: impl Into<ParticipantId>,
        intent: Intent,
    ) -> Result<(), RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Intent {
                participant_id: participant_id.into(),
                intent,
                reply,
            })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())??;
        Ok(())
    }

    /// Full read model from the actor
    pub async fn snapshot(&self) -> Result<SessionSnapshot, RuntimeError> {
        Ok(self.snapshot_at().await?.1)
    }

    /// Read model and the seq of the last event already published. Events
    /// with a higher seq come after it.
    pub async fn snapshot_at(&self) -> Result<(u64, SessionSnapshot), RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Snapshot { reply })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    /// Subscribe to this room's events.
    ///
    /// Ordered with intents: an intent submitted after this returns has all
    /// its events delivered to the receiver.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<RoomEvent>, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Subscribe { reply })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    /// Last published summary
    pub fn summary(&self) -> RoomSummary {
        self.summary.read().clone()
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) {
        let _ = self.commands.send(RoomCommand::Shutdown).await;
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Whether both handles talk to the same actor
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.commands.same_channel(&other.commands)
    }

    fn closed(&self) -> RuntimeError {
        RuntimeError::RoomClosed(self.session_id.clone())
    }
}

/// The task that owns a `Session`
pub struct RoomActor {
    session: Session,
    events: RoomChannel,
    commands: mpsc::Receiver<RoomCommand>,
    summary: Arc<RwLock<RoomSummary>>,
    /// Last published sequence number
    seq: u64,
    /// Origin of the monotonic clock handed to the session
    epoch: Instant,
    tick_interval: Duration,
}

impl RoomActor {
    /// Start an actor for `session` and return its handle and task
    pub fn spawn(session: Session, config: &RuntimeConfig) -> (RoomHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let summary = Arc::new(RwLock::new(RoomSummary::of(&session)));

        let handle = RoomHandle {
            session_id: session.id().to_string(),
            commands: tx,
            summary: summary.clone(),
        };

        let actor = RoomActor {
            session,
            events: RoomChannel::new(config.event_buffer),
            commands: rx,
            summary,
            seq: 0,
            epoch: Instant::now(),
            tick_interval: Duration::from_millis(config.prep_tick_ms.max(1)),
        };

        (handle, tokio::spawn(actor.run()))
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Room {} opened ({:?})", self.session.id(), self.session.mode());

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(RoomCommand::Intent { participant_id, intent, reply }) => {
                        let result = self.handle_intent(&participant_id, intent);
                        let _ = reply.send(result);
                        if self.session.is_empty() {
                            tracing::info!("Room {} is empty, closing", self.session.id());
                            break;
                        }
                    }
                    Some(RoomCommand::Snapshot { reply }) => {
                        let _ = reply.send((self.seq, self.session.snapshot()));
                    }
                    Some(RoomCommand::Subscribe { reply }) => {
                        let _ = reply.send(self.events.subscribe());
                    }
                    Some(RoomCommand::Shutdown) | None => break,
                },
                _ = ticker.tick(), if self.session.needs_ticks() => {
                    self.handle_tick();
                }
            }
        }

        self.commands.close();
        tracing::info!("Room {} closed after {} events", self.session.id(), self.seq);
    }

    fn now(&self) -> Moment {
        Moment::new(
            self.epoch.elapsed().as_millis() as u64,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    fn handle_intent(&mut self, participant_id: &str, intent: Intent) -> Result<(), MatchError> {
        let name = intent.name();
        let result = self.session.apply(participant_id, intent, self.now());
        match &result {
            Ok(()) => tracing::debug!(
                "Room {}: {} from {} accepted",
                self.session.id(),
                name,
                participant_id
            ),
            Err(e) => tracing::warn!(
                "Room {}: {} from {} rejected: {}",
                self.session.id(),
                name,
                participant_id,
                e
            ),
        }
        self.flush();
        result
    }

    fn handle_tick(&mut self) {
        let now = self.now();
        if let Err(e) = self.session.tick(now) {
            tracing::error!("Room {}: countdown tick failed: {}", self.session.id(), e);
        }
        self.flush();
    }

    /// Publish queued events in order and refresh the summary
    fn flush(&mut self) {
        let events = self.session.take_events();
        if events.is_empty() {
            return;
        }
        for event in events {
            self.seq += 1;
            self.events.publish(RoomEvent {
                session_id: self.session.id().to_string(),
                seq: self.seq,
                event,
            });
        }
        *self.summary.write() = RoomSummary::of(&self.session);
    }
}
