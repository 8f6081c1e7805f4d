//! WebSocket Server
//!
//! A connection is bound to one participant of one session by its first
//! frame, which must be a `join`. Replies go only to the sender. Room events
//! are forwarded in the order the room published them.
//!
//! A participant may reconnect on a new socket while the old one is still
//! open. The newest connection owns the seat; closing an older one does not
//! make the participant leave.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use match_core::{Intent, ParticipantId, SessionId};
use match_runtime::{RoomEvent, RoomHandle, RuntimeError};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::{
    protocol::{ClientFrame, ServerMessage},
    ArenaContext,
};

/// Outbound frames queued per connection
const OUTBOUND_BUFFER: usize = 256;

/// WebSocket Server
pub struct WebSocketServer {
    context: Arc<ArenaContext>,
}

/// The participant a connection speaks for
struct Binding {
    session_id: SessionId,
    participant_id: ParticipantId,
    /// Still seated (cleared by an accepted `leave`)
    joined: bool,
    room: RoomHandle,
    forwarder: JoinHandle<()>,
}

impl WebSocketServer {
    /// Create a new WebSocket server
    pub fn new(context: Arc<ArenaContext>) -> Self {
        Self { context }
    }

    /// Run the WebSocket server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("WebSocket server listening on {}", addr);
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        while let Ok((stream, peer_addr)) = listener.accept().await {
            let ctx = self.context.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, ctx).await {
                    tracing::warn!("WebSocket connection error from {}: {}", peer_addr, e);
                }
            });
        }
        Ok(())
    }
}

/// Handle a single WebSocket connection
async fn handle_connection(stream: TcpStream, context: Arc<ArenaContext>) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let connection_id = context.next_connection_id();

    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to encode outbound frame: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut binding: Option<Binding> = None;
    let mut result = Ok(());

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                result = Err(e.into());
                break;
            }
        };

        match serde_json::from_str::<ClientFrame>(&text) {
            Ok(frame) => handle_frame(frame, &context, connection_id, &out_tx, &mut binding).await,
            Err(e) => {
                let _ = out_tx
                    .send(ServerMessage::error(None, "BadFrame", e.to_string()))
                    .await;
            }
        }
    }

    if let Some(binding) = binding.take() {
        binding.forwarder.abort();
        let live = context.release(&binding.session_id, &binding.participant_id, connection_id);
        if !live {
            tracing::debug!(
                "Stale connection of {} in {} closed",
                binding.participant_id,
                binding.session_id
            );
        } else if binding.joined && context.leave_on_disconnect {
            match binding.room.submit(binding.participant_id.clone(), Intent::Leave).await {
                Ok(()) => tracing::info!(
                    "{} left session {} on disconnect",
                    binding.participant_id,
                    binding.session_id
                ),
                Err(e) => tracing::debug!(
                    "Leave on disconnect for {} failed: {}",
                    binding.participant_id,
                    e
                ),
            }
        }
    }

    drop(out_tx);
    let _ = writer.await;
    result
}

/// Route one frame to the registry and reply to the sender
async fn handle_frame(
    frame: ClientFrame,
    context: &ArenaContext,
    connection_id: u64,
    out_tx: &mpsc::Sender<ServerMessage>,
    binding: &mut Option<Binding>,
) {
    let request_id = frame.request_id;
    let intent_name = frame.intent.name();
    let is_join = matches!(frame.intent, Intent::Join { .. });
    let is_leave = matches!(frame.intent, Intent::Leave);

    match binding.as_ref() {
        None if !is_join => {
            let reply = ServerMessage::error(request_id, "NotJoined", "first frame must be a join");
            let _ = out_tx.send(reply).await;
            return;
        }
        Some(b) if b.session_id != frame.session_id || b.participant_id != frame.participant_id => {
            let reply = ServerMessage::error(
                request_id,
                "BindingMismatch",
                format!("connection belongs to {} in {}", b.participant_id, b.session_id),
            );
            let _ = out_tx.send(reply).await;
            return;
        }
        _ => {}
    }

    let result = if is_join {
        join(
            frame.session_id,
            frame.participant_id,
            frame.intent,
            context,
            connection_id,
            out_tx,
            binding,
        )
        .await
    } else {
        context
            .registry
            .submit(&frame.session_id, frame.participant_id.clone(), frame.intent)
            .await
            .map(|()| {
                if let Some(b) = binding.as_mut().filter(|_| is_leave) {
                    b.joined = false;
                    context.release(&b.session_id, &b.participant_id, connection_id);
                }
            })
    };

    let reply = match result {
        Ok(()) => ServerMessage::ack(request_id, intent_name),
        Err(e) => ServerMessage::rejected(request_id, &e),
    };
    let _ = out_tx.send(reply).await;
}

/// Join through the registry and (re)bind the connection to the seating room
async fn join(
    session_id: SessionId,
    participant_id: ParticipantId,
    intent: Intent,
    context: &ArenaContext,
    connection_id: u64,
    out_tx: &mpsc::Sender<ServerMessage>,
    binding: &mut Option<Binding>,
) -> Result<(), RuntimeError> {
    // Subscribed before the join is applied, so its own events arrive
    let (room, events) = context
        .registry
        .join(&session_id, participant_id.clone(), intent)
        .await?;
    context.bind(&session_id, &participant_id, connection_id);

    if let Some(b) = binding.as_mut().filter(|b| b.room.same_room(&room)) {
        b.joined = true;
        return Ok(());
    }

    tracing::debug!("{} bound to session {}", participant_id, session_id);
    let forwarder = spawn_forwarder(room.clone(), events, out_tx.clone());
    let previous = binding.replace(Binding {
        session_id,
        participant_id,
        joined: true,
        room,
        forwarder,
    });
    if let Some(old) = previous {
        old.forwarder.abort();
    }
    Ok(())
}

/// Forward a room's events to one connection. A subscriber that falls
/// behind gets a full resync instead of the events it missed.
fn spawn_forwarder(
    room: RoomHandle,
    mut receiver: broadcast::Receiver<RoomEvent>,
    out_tx: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let message = match receiver.recv().await {
                Ok(event) => ServerMessage::Event(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Subscriber of session {} lagged, {} events dropped, resyncing",
                        room.session_id(),
                        skipped
                    );
                    match room.snapshot_at().await {
                        Ok((seq, snapshot)) => ServerMessage::Resync { seq, snapshot },
                        Err(_) => break,
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if out_tx.send(message).await.is_err() {
                break;
            }
        }
    })
}
