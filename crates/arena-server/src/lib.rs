//! Arena Server - Network surfaces for match rooms
//!
//! - WebSocket endpoint: one connection speaks for one participant
//! - HTTP endpoint: health and read-only session views

pub mod http_server;
pub mod protocol;
pub mod ws_server;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use match_core::{ParticipantId, SessionId};
use match_runtime::{RuntimeConfig, SessionRegistry};

pub use http_server::HttpServer;
pub use protocol::{ClientFrame, ServerMessage};
pub use ws_server::WebSocketServer;

/// Shared state behind both servers
pub struct ArenaContext {
    pub registry: Arc<SessionRegistry>,
    /// Send `leave` for a participant whose connection drops
    pub leave_on_disconnect: bool,
    /// Newest connection bound to each seated participant
    connections: DashMap<(SessionId, ParticipantId), u64>,
    next_connection: AtomicU64,
}

impl ArenaContext {
    pub fn new(config: RuntimeConfig, leave_on_disconnect: bool) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(config)),
            leave_on_disconnect,
            connections: DashMap::new(),
            next_connection: AtomicU64::new(1),
        }
    }

    /// Id for a newly accepted connection
    pub fn next_connection_id(&self) -> u64 {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    /// Make `connection_id` the live connection of a participant
    pub fn bind(&self, session_id: &str, participant_id: &str, connection_id: u64) {
        self.connections
            .insert((session_id.to_string(), participant_id.to_string()), connection_id);
    }

    /// Drop the binding if `connection_id` still holds it. Returns false when
    /// a newer connection has taken over.
    pub fn release(&self, session_id: &str, participant_id: &str, connection_id: u64) -> bool {
        let key = (session_id.to_string(), participant_id.to_string());
        self.connections
            .remove_if(&key, |_, live| *live == connection_id)
            .is_some()
    }
}
