//! Forager decision procedure.
//!
//! A decision is split in two halves so a whole tick can decide in parallel
//! and commit serially:
//!
//! 1. [`decide`] only reads the grid and the forager's own state. It gathers
//!    neighbour candidates, drops excluded and illegal ones, scores the rest
//!    and picks the best (ties broken at random).
//! 2. [`Colony::commit`] applies the decision: pheromone deposit, move,
//!    goal handling and ageing.
//!
//! Score for a legal candidate `c`:
//!
//! ```text
//! pheromone_weight * pher(c) + cost_weight / max(cost(c), EPSILON) + random_weight * U[0, 1)
//! ```

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agent::Liveness;
use crate::colony::{Colony, ColonyParams, GoalPolicy, LayerRoles};
use crate::components::{ForagerState, Position};
use crate::error::SimResult;
use crate::grid::{Grid, LayerId};
use crate::world::AgentId;

/// Smallest cost used as a divisor when scoring.
pub const COST_EPSILON: f64 = 1e-6;

/// Result of [`decide`]: the candidates looked at and the chosen move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub candidates: Vec<Position>,
    pub next_step: Option<Position>,
}

/// What a commit did to a forager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No legal candidate; the forager stayed put.
    Stalled,
    /// Moved to an ordinary cell.
    Moved,
    /// Moved onto a site other than its home.
    Arrived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub step: Step,
    pub liveness: Liveness,
}

/// Whether a cost value marks passable terrain.
///
/// Null and non-finite costs are never legal. A missing limit leaves that
/// side of the band open.
pub fn is_legal(cost: Option<f64>, low: Option<f64>, high: Option<f64>) -> bool {
    match cost {
        Some(c) if c.is_finite() => {
            low.map_or(true, |lo| c >= lo) && high.map_or(true, |hi| c <= hi)
        }
        _ => false,
    }
}

fn pheromone_value(cell: Option<f64>, floor: f64) -> f64 {
    cell.filter(|v| v.is_finite()).unwrap_or(floor)
}

/// Random stream for one forager's decision in one tick.
///
/// Derived from the run seed, the tick and the forager's serial so the
/// outcome does not depend on which thread runs the decision.
pub fn decision_rng(seed: u64, tick: u64, serial: u64) -> ChaCha8Rng {
    let mixed = seed
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ serial.wrapping_mul(0xC2B2_AE3D_27D4_EB4F).rotate_left(31);
    ChaCha8Rng::seed_from_u64(mixed)
}

/// Pick the best legal cell out of `candidates`.
///
/// Cells excluded by `state` (backtracking window, departed home) are
/// skipped first. [`decide`] has already dropped them from its neighbours;
/// the check here covers explicit candidate lists from `decide_among`.
/// Returns `None` if nothing legal is left.
pub fn choose<R: Rng + ?Sized>(
    grid: &Grid,
    roles: &LayerRoles,
    params: &ColonyParams,
    state: &ForagerState,
    candidates: &[Position],
    rng: &mut R,
) -> SimResult<Option<Position>> {
    let mut best_score = f64::NEG_INFINITY;
    let mut best: Vec<Position> = Vec::new();

    for &cell in candidates {
        if state.excludes(cell) {
            continue;
        }
        let cost = grid.value(roles.cost, cell)?;
        if !is_legal(cost, params.low_cost_limit, params.high_cost_limit) {
            continue;
        }
        let cost = cost.unwrap_or(COST_EPSILON);
        let pher = pheromone_value(grid.value(roles.pheromone, cell)?, params.min_pheromone);

        let score = params.pheromone_weight * pher
            + params.cost_weight / cost.max(COST_EPSILON)
            + params.random_weight * rng.gen::<f64>();

        if score > best_score {
            best_score = score;
            best.clear();
            best.push(cell);
        } else if score == best_score {
            best.push(cell);
        } else if best.is_empty() && score.is_nan() {
            // NaN only wins when nothing else is legal
            best.push(cell);
        }
    }

    Ok(best.choose(rng).copied())
}

/// Gather neighbour candidates of `position` and choose among them.
pub fn decide<R: Rng + ?Sized>(
    grid: &Grid,
    roles: &LayerRoles,
    params: &ColonyParams,
    position: Position,
    state: &ForagerState,
    rng: &mut R,
) -> SimResult<Decision> {
    let candidates: Vec<Position> = grid
        .neighbors(position, rng)
        .filter(|cell| !state.excludes(*cell))
        .collect();
    let next_step = choose(grid, roles, params, state, &candidates, rng)?;
    Ok(Decision {
        candidates,
        next_step,
    })
}

/// Add `amount` to a pheromone cell, clamped to `[min, max]`. A null cell
/// counts as `min`. Returns the stored value.
pub fn deposit(
    grid: &mut Grid,
    layer: LayerId,
    pos: Position,
    amount: f64,
    min: f64,
    max: f64,
) -> SimResult<f64> {
    let current = pheromone_value(grid.value(layer, pos)?, min);
    let value = (current + amount).clamp(min, max);
    grid.set_value(layer, pos, Some(value))?;
    Ok(value)
}

impl Colony {
    /// Decide the next move for one forager.
    pub fn decide<R: Rng + ?Sized>(&self, id: AgentId, rng: &mut R) -> SimResult<Decision> {
        let (position, state) = match (self.population.position(id), self.population.forager(id)) {
            (Some(p), Some(s)) => (p, s),
            _ => return Ok(Decision::default()),
        };
        decide(self.grid(), &self.roles, &self.params, position, &state, rng)
    }

    /// Decide among an explicit candidate list instead of the neighbours.
    pub fn decide_among<R: Rng + ?Sized>(
        &self,
        id: AgentId,
        candidates: &[Position],
        rng: &mut R,
    ) -> SimResult<Decision> {
        let state = self.population.forager(id).unwrap_or_default();
        let next_step = choose(self.grid(), &self.roles, &self.params, &state, candidates, rng)?;
        Ok(Decision {
            candidates: candidates.to_vec(),
            next_step,
        })
    }

    /// Apply a decision made for `id`.
    ///
    /// A stall only ages the forager. A move deposits `step_intensity` on
    /// the vacated cell, moves, remembers the vacated cell and ages. Moving
    /// onto a site other than home also deposits `path_intensity` there and
    /// applies the goal policy instead of ageing.
    pub fn commit(&mut self, id: AgentId, decision: Decision) -> SimResult<Commit> {
        let current = match self.population.position(id) {
            Some(p) => p,
            None => {
                return Ok(Commit {
                    step: Step::Stalled,
                    liveness: Liveness::Dead,
                })
            }
        };
        let next_step = decision.next_step;
        self.population.with_forager(id, |state| {
            state.candidates = decision.candidates;
            state.next_step = next_step;
        });

        let next = match next_step {
            Some(next) => next,
            None => {
                return Ok(Commit {
                    step: Step::Stalled,
                    liveness: self.population.age(id),
                })
            }
        };

        let (min, max) = (self.params.min_pheromone, self.params.max_pheromone);
        let pheromone = self.roles.pheromone;
        deposit(
            self.population.grid_mut(),
            pheromone,
            current,
            self.params.step_intensity,
            min,
            max,
        )?;
        self.population.set_position(id, next);

        let window = self.params.backtrack_window;
        let home = self
            .population
            .with_forager(id, |state| {
                state.remember(current, window);
                state.departed = true;
                state.home
            })
            .unwrap_or(current);

        if next != home && self.is_site(next) {
            deposit(
                self.population.grid_mut(),
                pheromone,
                next,
                self.params.path_intensity,
                min,
                max,
            )?;
            let liveness = match self.params.goal_policy {
                GoalPolicy::Retire => {
                    self.population.die(id);
                    Liveness::Dead
                }
                GoalPolicy::Reset => {
                    self.population.renew(id);
                    self.population.with_forager(id, |state| state.rehome(next));
                    Liveness::Alive
                }
            };
            return Ok(Commit {
                step: Step::Arrived,
                liveness,
            });
        }

        Ok(Commit {
            step: Step::Moved,
            liveness: self.population.age(id),
        })
    }
}
