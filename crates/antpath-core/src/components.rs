//! Component definitions for agents stored in the population arena.
//!
//! Components are pure data attached to agent entities. Behaviour lives in
//! [`crate::world`], [`crate::agent`] and [`crate::forager`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Cell coordinate on the grid, row-major with row 0 at the north edge.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Apply a signed offset, returning `None` on underflow.
    pub fn offset(&self, d_row: isize, d_col: isize) -> Option<Self> {
        Some(Self {
            row: self.row.checked_add_signed(d_row)?,
            col: self.col.checked_add_signed(d_col)?,
        })
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}

/// Remaining time to live, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifespan {
    pub ttl: u32,
    /// ttl at spawn time, restored by [`Lifespan::renew`]
    pub initial: u32,
}

impl Lifespan {
    pub fn new(ttl: u32) -> Self {
        Self { ttl, initial: ttl }
    }

    /// Decrement and report whether any life is left.
    pub fn tick(&mut self) -> bool {
        self.ttl = self.ttl.saturating_sub(1);
        self.ttl > 0
    }

    pub fn renew(&mut self) {
        self.ttl = self.initial;
    }
}

/// Spawn-order serial number. Stable for the agent's whole life and used to
/// derive its per-tick random stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Serial(pub u64);

/// Per-forager decision state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForagerState {
    /// Site the forager was spawned on (or re-homed to).
    pub home: Position,
    /// Set after the first move away from `home`.
    pub departed: bool,
    /// Most recently vacated cells, newest first.
    pub last_steps: VecDeque<Position>,
    /// Candidates considered by the last decision.
    pub candidates: Vec<Position>,
    /// Move chosen by the last decision. `None` means stall.
    pub next_step: Option<Position>,
}

impl ForagerState {
    pub fn new(home: Position) -> Self {
        Self {
            home,
            ..Default::default()
        }
    }

    /// Remember a vacated cell, keeping at most `window` entries.
    pub fn remember(&mut self, vacated: Position, window: usize) {
        if window == 0 {
            self.last_steps.clear();
            return;
        }
        self.last_steps.push_front(vacated);
        self.last_steps.truncate(window);
    }

    /// Whether `cell` is excluded from this forager's candidates.
    pub fn excludes(&self, cell: Position) -> bool {
        (self.departed && cell == self.home) || self.last_steps.contains(&cell)
    }

    pub fn rehome(&mut self, home: Position) {
        self.home = home;
        self.departed = false;
        self.last_steps.clear();
    }
}
