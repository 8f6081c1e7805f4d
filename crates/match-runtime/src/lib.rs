//! Match Runtime - Actors and registry around the match core
//!
//! This crate runs sessions:
//! - One single-writer actor per session (`RoomActor`)
//! - A registry that opens rooms on first join and drops them when empty
//! - Per-room FIFO event fan-out, one broadcast channel per room instance
//! - The server-owned preparation countdown

pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod room;


pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use gateway::{RoomChannel, RoomEvent};
pub use registry::{ScrambleFactory, SessionRegistry};
pub use room::{RoomActor, RoomCommand, RoomHandle, RoomSummary};

/// Countdown tick interval while a holder is preparing (4Hz)
pub const PREP_TICK_MS: u64 = 250;

/// Queued intents per room before senders wait
pub const COMMAND_BUFFER: usize = 256;

/// Buffered events per room subscriber before it starts lagging
pub const EVENT_BUFFER: usize = 1024;
