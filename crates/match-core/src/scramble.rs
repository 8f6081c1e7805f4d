//! Scramble Dispenser
//!
//! Sources of round scrambles. The session pulls exactly one scramble per
//! round transition; every scramble is generated from scratch and never
//! depends on a previous one.

use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Puzzle family a scramble is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Puzzle {
    Cube2,
    #[default]
    Cube3,
    Cube4,
}

impl Puzzle {
    /// Moves per scramble
    pub fn scramble_length(self) -> usize {
        match self {
            Puzzle::Cube2 => 11,
            Puzzle::Cube3 => 20,
            Puzzle::Cube4 => 40,
        }
    }

    /// Turnable layers as (notation, face, axis)
    fn layers(self) -> &'static [(&'static str, char, u8)] {
        const CUBE2: &[(&str, char, u8)] = &[("U", 'U', 0), ("R", 'R', 1), ("F", 'F', 2)];
        const CUBE3: &[(&str, char, u8)] = &[
            ("U", 'U', 0),
            ("D", 'D', 0),
            ("R", 'R', 1),
            ("L", 'L', 1),
            ("F", 'F', 2),
            ("B", 'B', 2),
        ];
        const CUBE4: &[(&str, char, u8)] = &[
            ("U", 'U', 0),
            ("D", 'D', 0),
            ("Uw", 'U', 0),
            ("R", 'R', 1),
            ("L", 'L', 1),
            ("Rw", 'R', 1),
            ("F", 'F', 2),
            ("B", 'B', 2),
            ("Fw", 'F', 2),
        ];
        match self {
            Puzzle::Cube2 => CUBE2,
            Puzzle::Cube3 => CUBE3,
            Puzzle::Cube4 => CUBE4,
        }
    }
}

const SUFFIXES: [&str; 3] = ["", "'", "2"];

/// Generate one random-move scramble.
///
/// No two consecutive moves turn the same face, and no three consecutive
/// moves share an axis (e.g. `R L R`), so no move cancels another.
pub fn generate<R: Rng + ?Sized>(puzzle: Puzzle, rng: &mut R) -> String {
    let layers = puzzle.layers();
    let length = puzzle.scramble_length();
    let mut moves: Vec<String> = Vec::with_capacity(length);
    let mut history: Vec<(char, u8)> = Vec::with_capacity(length);

    while moves.len() < length {
        let (notation, face, axis) = layers[rng.gen_range(0..layers.len())];

        if let Some(&(last_face, last_axis)) = history.last() {
            if last_face == face {
                continue;
            }
            if history.len() >= 2 {
                let (_, prev_axis) = history[history.len() - 2];
                if prev_axis == axis && last_axis == axis {
                    continue;
                }
            }
        }

        let suffix = SUFFIXES[rng.gen_range(0..SUFFIXES.len())];
        moves.push(format!("{}{}", notation, suffix));
        history.push((face, axis));
    }

    moves.join(" ")
}

/// Anything that can hand out round scrambles
pub trait ScrambleSource: Send {
    /// Next scramble, or `None` if none can be produced right now
    fn next_scramble(&mut self) -> Option<String>;
}

/// Random-move scrambler
pub struct RandomScrambler {
    puzzle: Puzzle,
    rng: StdRng,
}

impl RandomScrambler {
    /// Scrambler seeded from OS entropy
    pub fn new(puzzle: Puzzle) -> Self {
        Self {
            puzzle,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic scrambler
    pub fn seeded(puzzle: Puzzle, seed: u64) -> Self {
        Self {
            puzzle,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ScrambleSource for RandomScrambler {
    fn next_scramble(&mut self) -> Option<String> {
        Some(generate(self.puzzle, &mut self.rng))
    }
}

/// Pre-set scrambles handed out in order. Runs dry once exhausted.
#[derive(Debug, Clone, Default)]
pub struct FixedScrambles {
    queue: VecDeque<String>,
}

impl FixedScrambles {
    pub fn new<I, S>(scrambles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: scrambles.into_iter().map(Into::into).collect(),
        }
    }

    /// Queue more scrambles
    pub fn push(&mut self, scramble: impl Into<String>) {
        self.queue.push_back(scramble.into());
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl ScrambleSource for FixedScrambles {
    fn next_scramble(&mut self) -> Option<String> {
        self.queue.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_of(token: &str) -> u8 {
        match token.chars().next().unwrap() {
            'U' | 'D' => 0,
            'R' | 'L' => 1,
            _ => 2,
        }
    }

    fn face_of(token: &str) -> String {
        token.trim_end_matches(['\'', '2']).to_string()
    }

    #[test]
    fn test_scramble_lengths() {
        let mut rng = StdRng::seed_from_u64(7);
        for puzzle in [Puzzle::Cube2, Puzzle::Cube3, Puzzle::Cube4] {
            let scramble = generate(puzzle, &mut rng);
            assert_eq!(scramble.split(' ').count(), puzzle.scramble_length());
        }
    }

    #[test]
    fn test_no_redundant_moves() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let scramble = generate(Puzzle::Cube3, &mut rng);
            let tokens: Vec<&str> = scramble.split(' ').collect();
            for pair in tokens.windows(2) {
                assert_ne!(face_of(pair[0]), face_of(pair[1]), "{}", scramble);
            }
            for triple in tokens.windows(3) {
                let axes: Vec<u8> = triple.iter().map(|t| axis_of(t)).collect();
                assert!(!(axes[0] == axes[1] && axes[1] == axes[2]), "{}", scramble);
            }
        }
    }

    #[test]
    fn test_seeded_scrambler_is_deterministic() {
        let mut a = RandomScrambler::seeded(Puzzle::Cube3, 99);
        let mut b = RandomScrambler::seeded(Puzzle::Cube3, 99);
        assert_eq!(a.next_scramble(), b.next_scramble());
        assert_ne!(a.next_scramble(), a.next_scramble());
    }

    #[test]
    fn test_fixed_scrambles_run_dry() {
        let mut fixed = FixedScrambles::new(["R U", "F D"]);
        assert_eq!(fixed.next_scramble().as_deref(), Some("R U"));
        assert_eq!(fixed.remaining(), 1);
        assert_eq!(fixed.next_scramble().as_deref(), Some("F D"));
        assert_eq!(fixed.next_scramble(), None);
    }
}
