//! Turn Arbiter
//!
//! Fixed per-round seat order. The host's seat always goes first; the rest
//! follow the canonical order (duel: the other seat; squad: A0, B0, A1, B1
//! rotated so the host leads). The order repeats identically every round.

use serde::Serialize;

use crate::state::{Mode, Seat};

/// Seat order for every round of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOrder {
    seats: Vec<Seat>,
}

impl TurnOrder {
    /// Build the order for `mode` with the host sitting in `host_seat`
    pub fn new(mode: Mode, host_seat: Seat) -> Self {
        let mut seats = mode.seats();
        if let Some(lead) = seats.iter().position(|s| *s == host_seat) {
            seats.rotate_left(lead);
        }
        Self { seats }
    }

    /// Seat holding turn `index` within a round
    pub fn seat_at(&self, index: usize) -> Option<Seat> {
        self.seats.get(index).copied()
    }

    /// Solves per round
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }
}
