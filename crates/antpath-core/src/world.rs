//! Agent population bound to one grid.
//!
//! Agents live as entities in a `hecs::World` arena and are referred to by
//! [`AgentId`] handles, so an agent never holds a reference back to its
//! population. A spawn-ordered roster fixes the iteration order that every
//! tick uses.

use hecs::Entity;
use rand::Rng;

use crate::components::{ForagerState, Lifespan, Position, Serial};
use crate::error::{SimError, SimResult};
use crate::grid::Grid;

/// Lightweight handle to an agent in a [`Population`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub(crate) Entity);

/// Concrete agent type a population instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Plain agent that walks to a random neighbour each step.
    Walker,
    /// Agent carrying [`ForagerState`] for the weighted decision procedure.
    Forager,
}

/// Homogeneous collection of live agents on a grid.
pub struct Population {
    kind: AgentKind,
    grid: Grid,
    agents: hecs::World,
    roster: Vec<Entity>,
    next_serial: u64,
}

impl Population {
    pub fn new(grid: Grid, kind: AgentKind) -> Self {
        Self {
            kind,
            grid,
            agents: hecs::World::new(),
            roster: Vec::new(),
            next_serial: 0,
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains(id.0)
    }

    /// Live agents in spawn order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.roster.iter().copied().map(AgentId).collect()
    }

    /// Create an agent of this population's kind at `position`.
    pub fn spawn(&mut self, ttl: u32, position: Position) -> SimResult<AgentId> {
        if !self.grid.contains(position) {
            return Err(SimError::SpawnOutsideGrid {
                position,
                rows: self.grid.rows(),
                cols: self.grid.cols(),
            });
        }
        if ttl == 0 {
            return Err(SimError::parameter("ttl", "agents need a ttl of at least 1"));
        }

        let serial = Serial(self.next_serial);
        self.next_serial += 1;
        let life = Lifespan::new(ttl);
        let entity = match self.kind {
            AgentKind::Walker => self.agents.spawn((position, life, serial)),
            AgentKind::Forager => {
                self.agents
                    .spawn((position, life, serial, ForagerState::new(position)))
            }
        };
        self.roster.push(entity);
        Ok(AgentId(entity))
    }

    /// Remove an agent. Returns `false` if it was already gone.
    pub fn kill(&mut self, id: AgentId) -> bool {
        if self.agents.despawn(id.0).is_err() {
            return false;
        }
        if let Some(idx) = self.roster.iter().position(|e| *e == id.0) {
            self.roster.remove(idx);
        }
        true
    }

    /// In-bounds neighbours of `position` in random order.
    pub fn neighbor_positions<R: Rng + ?Sized>(&self, position: Position, rng: &mut R) -> Vec<Position> {
        self.grid.neighbors(position, rng).collect()
    }

    pub fn serial(&self, id: AgentId) -> Option<u64> {
        self.agents.get::<&Serial>(id.0).ok().map(|s| s.0)
    }

    pub fn forager(&self, id: AgentId) -> Option<ForagerState> {
        self.agents
            .get::<&ForagerState>(id.0)
            .ok()
            .map(|state| (*state).clone())
    }

    /// Apply `f` to the agent's forager state, if it has one.
    pub fn with_forager<T>(&mut self, id: AgentId, f: impl FnOnce(&mut ForagerState) -> T) -> Option<T> {
        self.agents
            .get::<&mut ForagerState>(id.0)
            .ok()
            .map(|mut state| f(&mut *state))
    }

    pub(crate) fn lifespan_mut(&mut self, id: AgentId) -> Option<hecs::RefMut<'_, Lifespan>> {
        self.agents.get::<&mut Lifespan>(id.0).ok()
    }

    pub(crate) fn lifespan(&self, id: AgentId) -> Option<Lifespan> {
        self.agents.get::<&Lifespan>(id.0).ok().map(|l| *l)
    }

    pub(crate) fn position_ref(&self, id: AgentId) -> Option<Position> {
        self.agents.get::<&Position>(id.0).ok().map(|p| *p)
    }

    pub(crate) fn position_mut(&mut self, id: AgentId) -> Option<hecs::RefMut<'_, Position>> {
        self.agents.get::<&mut Position>(id.0).ok()
    }
}
