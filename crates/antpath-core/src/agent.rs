//! Generic agent operations: position, ageing, death and random walking.
//!
//! These act on an [`AgentId`] through the owning [`Population`], which is
//! how an agent reaches "its world" without a back-reference.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::Position;
use crate::world::{AgentId, Population};

/// Outcome of ageing an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead,
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        matches!(self, Liveness::Alive)
    }
}

impl Population {
    pub fn position(&self, id: AgentId) -> Option<Position> {
        self.position_ref(id)
    }

    pub fn ttl(&self, id: AgentId) -> Option<u32> {
        self.lifespan(id).map(|l| l.ttl)
    }

    /// Overwrite an agent's position. The caller is responsible for
    /// legality; returns `false` if the agent no longer exists.
    pub fn set_position(&mut self, id: AgentId, position: Position) -> bool {
        match self.position_mut(id) {
            Some(mut pos) => {
                *pos = position;
                true
            }
            None => false,
        }
    }

    /// Decrement the agent's ttl, removing it when the ttl runs out.
    pub fn age(&mut self, id: AgentId) -> Liveness {
        let alive = match self.lifespan_mut(id) {
            Some(mut life) => life.tick(),
            None => return Liveness::Dead,
        };
        if alive {
            Liveness::Alive
        } else {
            self.die(id);
            Liveness::Dead
        }
    }

    /// Remove the agent from its population.
    pub fn die(&mut self, id: AgentId) {
        self.kill(id);
    }

    /// Restore the agent's ttl to its spawn value.
    pub fn renew(&mut self, id: AgentId) {
        if let Some(mut life) = self.lifespan_mut(id) {
            life.renew();
        }
    }

    /// Move to a uniformly chosen neighbour, unconditionally. Returns the new
    /// position, or `None` when the agent is gone or has no neighbour.
    pub fn random_step<R: Rng + ?Sized>(&mut self, id: AgentId, rng: &mut R) -> Option<Position> {
        let current = self.position(id)?;
        let next = *self.neighbor_positions(current, rng).choose(rng)?;
        self.set_position(id, next);
        Some(next)
    }

    /// One generic tick for plain agents: every agent takes a random step
    /// and ages. Returns how many agents died.
    pub fn step_walkers<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut deaths = 0;
        for id in self.ids() {
            self.random_step(id, rng);
            if !self.age(id).is_alive() {
                deaths += 1;
            }
        }
        deaths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Bounds, Grid};
    use crate::world::AgentKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn walkers() -> Population {
        let grid = Grid::with_bounds(Bounds::new(5.0, 0.0, 5.0, 0.0), 5, 5).unwrap();
        Population::new(grid, AgentKind::Walker)
    }

    #[test]
    fn test_age_until_dead() {
        let mut pop = walkers();
        let id = pop.spawn(3, Position::new(2, 2)).unwrap();
        assert_eq!(pop.age(id), Liveness::Alive);
        assert_eq!(pop.ttl(id), Some(2));
        assert_eq!(pop.age(id), Liveness::Alive);
        assert_eq!(pop.age(id), Liveness::Dead);
        assert!(!pop.contains(id));
        assert!(pop.is_empty());
        // ageing a removed agent stays dead
        assert_eq!(pop.age(id), Liveness::Dead);
    }

    #[test]
    fn test_mortality_within_initial_ttl() {
        let mut pop = walkers();
        for ttl in 1..=12u32 {
            let id = pop.spawn(ttl, Position::new(0, 0)).unwrap();
            let calls = (1..=ttl)
                .find(|_| !pop.age(id).is_alive())
                .expect("agent outlived its ttl");
            assert!(calls <= ttl);
            assert!(!pop.ids().contains(&id));
        }
    }

    #[test]
    fn test_set_position_and_renew() {
        let mut pop = walkers();
        let id = pop.spawn(2, Position::new(0, 0)).unwrap();
        assert!(pop.set_position(id, Position::new(4, 4)));
        assert_eq!(pop.position(id), Some(Position::new(4, 4)));
        pop.age(id);
        pop.renew(id);
        assert_eq!(pop.ttl(id), Some(2));

        pop.die(id);
        assert!(!pop.set_position(id, Position::new(1, 1)));
    }

    #[test]
    fn test_random_step_moves_to_neighbor() {
        let mut pop = walkers();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let id = pop.spawn(10, Position::new(0, 0)).unwrap();
        let next = pop.random_step(id, &mut rng).unwrap();
        assert!(next.row <= 1 && next.col <= 1);
        assert_ne!(next, Position::new(0, 0));
        assert_eq!(pop.position(id), Some(next));
    }

    #[test]
    fn test_step_walkers_expires_everyone() {
        let mut pop = walkers();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for col in 0..5 {
            pop.spawn(4, Position::new(2, col)).unwrap();
        }
        let mut deaths = 0;
        for _ in 0..4 {
            deaths += pop.step_walkers(&mut rng);
            assert!(pop.ids().iter().all(|id| {
                let p = pop.position(*id).unwrap();
                pop.grid().contains(p)
            }));
        }
        assert_eq!(deaths, 5);
        assert!(pop.is_empty());
    }
}
