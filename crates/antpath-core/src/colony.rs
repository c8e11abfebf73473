//! Ant colony: a forager population bound to site, cost and pheromone layers.
//!
//! One colony tick runs three phases in order:
//!
//! | Phase | Effect |
//! |-------|--------|
//! | spawn | fill the population up to `max_population` from the site list |
//! | act   | every forager decides (read-only, optionally parallel), then all decisions commit serially in spawn order |
//! | decay | half-life decay of the pheromone layer, held within `[min_pheromone, max_pheromone]` |
//!
//! Snapshots are the driver's business, see [`crate::driver`].

use std::collections::HashSet;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::Liveness;
use crate::components::{ForagerState, Position};
use crate::driver::SimulationState;
use crate::error::{SimError, SimResult};
use crate::forager::{decide, decision_rng, Decision, Step};
use crate::grid::{Grid, LayerData, LayerId, LayerInit};
use crate::world::{AgentId, AgentKind, Population};

/// Ticks of life per cell of grid diagonal when no ttl is configured.
pub const DEFAULT_TTL_PER_DIAGONAL_CELL: f64 = 2.0;

/// What happens to a forager that reaches a site other than its home.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPolicy {
    /// Remove it from the colony.
    #[default]
    Retire,
    /// Restore its ttl, re-home it at the reached site and keep going.
    Reset,
}

/// How spawn sites are drawn from the site list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteSelection {
    #[default]
    RoundRobin,
    Random,
}

/// Layer names a colony binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerNames {
    pub site: String,
    pub cost: String,
    pub pheromone: String,
}

impl LayerNames {
    pub fn new(site: impl Into<String>, cost: impl Into<String>, pheromone: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            cost: cost.into(),
            pheromone: pheromone.into(),
        }
    }
}

/// Layer handles resolved once when the colony is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRoles {
    pub site: LayerId,
    pub cost: LayerId,
    pub pheromone: LayerId,
}

/// Colony-wide tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyParams {
    pub max_population: usize,
    /// `None` derives the ttl from the grid diagonal.
    pub agent_ttl: Option<u32>,
    pub min_pheromone: f64,
    pub max_pheromone: f64,
    /// Ticks for pheromone to halve; `<= 0` freezes the layer.
    pub half_life: f64,
    /// Deposited on every cell a forager leaves.
    pub step_intensity: f64,
    /// Deposited on a site when a forager reaches it.
    pub path_intensity: f64,
    pub pheromone_weight: f64,
    pub random_weight: f64,
    pub cost_weight: f64,
    /// `None` leaves the lower side of the legal band open.
    pub low_cost_limit: Option<f64>,
    /// `None` leaves the upper side of the legal band open.
    pub high_cost_limit: Option<f64>,
    /// How many vacated cells a forager refuses to step back onto.
    pub backtrack_window: usize,
    pub goal_policy: GoalPolicy,
    pub site_selection: SiteSelection,
    pub parallel: bool,
}

impl Default for ColonyParams {
    fn default() -> Self {
        Self {
            max_population: 400,
            agent_ttl: None,
            min_pheromone: 0.0,
            max_pheromone: 1_000_000.0,
            half_life: 25.0,
            step_intensity: 10.0,
            path_intensity: 10_000.0,
            pheromone_weight: 1.0,
            random_weight: 1.0,
            cost_weight: 1.0,
            low_cost_limit: Some(0.0),
            high_cost_limit: None,
            backtrack_window: 1,
            goal_policy: GoalPolicy::Retire,
            site_selection: SiteSelection::RoundRobin,
            parallel: true,
        }
    }
}

impl ColonyParams {
    /// Reject parameter combinations the algorithm cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        let finite = [
            ("min_pheromone", self.min_pheromone),
            ("max_pheromone", self.max_pheromone),
            ("half_life", self.half_life),
            ("step_intensity", self.step_intensity),
            ("path_intensity", self.path_intensity),
            ("pheromone_weight", self.pheromone_weight),
            ("random_weight", self.random_weight),
            ("cost_weight", self.cost_weight),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(SimError::parameter(name, format!("{} is not finite", value)));
            }
        }
        if self.min_pheromone > self.max_pheromone {
            return Err(SimError::parameter(
                "min_pheromone",
                format!(
                    "{} is above max_pheromone {}",
                    self.min_pheromone, self.max_pheromone
                ),
            ));
        }
        if let (Some(lo), Some(hi)) = (self.low_cost_limit, self.high_cost_limit) {
            if lo > hi {
                return Err(SimError::parameter(
                    "low_cost_limit",
                    format!("{} is above high_cost_limit {}", lo, hi),
                ));
            }
        }
        if self.agent_ttl == Some(0) {
            return Err(SimError::parameter("agent_ttl", "must be at least 1"));
        }
        Ok(())
    }
}

/// Counters for one colony tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: u64,
    pub spawned: usize,
    pub moved: usize,
    pub stalled: usize,
    /// Foragers that reached a site other than their home.
    pub arrived: usize,
    /// Foragers whose ttl ran out.
    pub expired: usize,
    /// Live foragers after the tick.
    pub population: usize,
}

/// Forager population specialised for ant colony optimization.
pub struct Colony {
    pub(crate) population: Population,
    pub(crate) roles: LayerRoles,
    pub(crate) params: ColonyParams,
    sites: Vec<Position>,
    site_set: HashSet<Position>,
    next_site: usize,
    ttl: u32,
}

impl Colony {
    /// Bind a colony to `grid`.
    ///
    /// The site and cost layers must already be in the grid. A missing
    /// pheromone layer is created and filled with `min_pheromone`.
    pub fn new(mut grid: Grid, names: &LayerNames, params: ColonyParams) -> SimResult<Self> {
        params.validate()?;
        let site = grid
            .layer_id(&names.site)
            .ok_or_else(|| SimError::MissingSiteLayer(names.site.clone()))?;
        let cost = grid.require(&names.cost)?;
        let pheromone = match grid.layer_id(&names.pheromone) {
            Some(id) => id,
            None => grid.add_layer(
                &names.pheromone,
                LayerInit::Fill(Some(params.min_pheromone)),
                false,
            )?,
        };

        let sites = site_cells(&grid, site);
        if sites.is_empty() {
            return Err(SimError::NoSites(names.site.clone()));
        }
        let ttl = params.agent_ttl.unwrap_or_else(|| default_ttl(&grid));
        log::debug!(
            "colony bound to {}x{} grid: {} sites, ttl {}",
            grid.rows(),
            grid.cols(),
            sites.len(),
            ttl
        );

        Ok(Self {
            population: Population::new(grid, AgentKind::Forager),
            roles: LayerRoles {
                site,
                cost,
                pheromone,
            },
            params,
            site_set: sites.iter().copied().collect(),
            sites,
            next_site: 0,
            ttl,
        })
    }

    pub fn grid(&self) -> &Grid {
        self.population.grid()
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        self.population.grid_mut()
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn params(&self) -> &ColonyParams {
        &self.params
    }

    pub fn sites(&self) -> &[Position] {
        &self.sites
    }

    pub fn is_site(&self, pos: Position) -> bool {
        self.site_set.contains(&pos)
    }

    /// ttl given to newly spawned foragers.
    pub fn agent_ttl(&self) -> u32 {
        self.ttl
    }

    pub fn pheromone(&self) -> SimResult<LayerData> {
        let name = self.grid().layer_name(self.roles.pheromone).to_string();
        self.grid().export_layer(&name)
    }

    /// Spawn one forager at the next site.
    pub fn spawn_forager<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimResult<AgentId> {
        let site = self.pick_site(rng)?;
        self.population.spawn(self.ttl, site)
    }

    fn pick_site<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimResult<Position> {
        if self.sites.is_empty() {
            let name = self.grid().layer_name(self.roles.site).to_string();
            return Err(SimError::NoSites(name));
        }
        let idx = match self.params.site_selection {
            SiteSelection::RoundRobin => {
                let idx = self.next_site % self.sites.len();
                self.next_site = self.next_site.wrapping_add(1);
                idx
            }
            SiteSelection::Random => rng.gen_range(0..self.sites.len()),
        };
        Ok(self.sites[idx])
    }

    /// Fill the population up to `max_population`. Returns how many spawned.
    pub fn spawn_phase<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimResult<usize> {
        let mut spawned = 0;
        while self.population.len() < self.params.max_population {
            self.spawn_forager(rng)?;
            spawned += 1;
        }
        Ok(spawned)
    }

    /// Decide for every forager, then commit every decision in spawn order.
    pub fn act_phase(&mut self, seed: u64, tick: u64) -> SimResult<TickSummary> {
        let decisions = self.decide_all(seed, tick)?;
        let mut summary = TickSummary::default();
        for (id, decision) in decisions {
            let commit = self.commit(id, decision)?;
            match commit.step {
                Step::Stalled => summary.stalled += 1,
                Step::Moved => summary.moved += 1,
                Step::Arrived => summary.arrived += 1,
            }
            if commit.step != Step::Arrived && commit.liveness == Liveness::Dead {
                summary.expired += 1;
            }
        }
        Ok(summary)
    }

    /// Read-only decision pass over every live forager.
    pub fn decide_all(&self, seed: u64, tick: u64) -> SimResult<Vec<(AgentId, Decision)>> {
        let snapshots: Vec<_> = self
            .population
            .ids()
            .into_iter()
            .filter_map(|id| {
                Some((
                    id,
                    self.population.position(id)?,
                    self.population.forager(id)?,
                    self.population.serial(id)?,
                ))
            })
            .collect();

        let grid = self.grid();
        let (roles, params) = (&self.roles, &self.params);
        let decide_one = |(id, position, state, serial): &(AgentId, Position, ForagerState, u64)| {
            let mut rng = decision_rng(seed, tick, *serial);
            decide(grid, roles, params, *position, state, &mut rng).map(|d| (*id, d))
        };

        if self.params.parallel {
            snapshots.par_iter().map(decide_one).collect()
        } else {
            snapshots.iter().map(decide_one).collect()
        }
    }

    /// Decay the pheromone layer, then hold it within
    /// `[min_pheromone, max_pheromone]`.
    pub fn decay_phase(&mut self) {
        let (half_life, floor, ceiling, parallel) = (
            self.params.half_life,
            self.params.min_pheromone,
            self.params.max_pheromone,
            self.params.parallel,
        );
        let pheromone = self.roles.pheromone;
        let grid = self.grid_mut();
        grid.decay(pheromone, half_life, floor, parallel);
        grid.clamp(pheromone, floor, ceiling, parallel);
    }

    /// Run spawn, act and decay once, advancing `state.tick`.
    pub fn tick(&mut self, state: &mut SimulationState) -> SimResult<TickSummary> {
        let tick = state.tick + 1;
        let spawned = self.spawn_phase(state.rng())?;
        let mut summary = self.act_phase(state.seed, tick)?;
        if summary.stalled > 0 && summary.moved == 0 && summary.arrived == 0 {
            log::warn!("tick {}: all {} foragers stalled", tick, summary.stalled);
        }
        self.decay_phase();

        summary.tick = tick;
        summary.spawned = spawned;
        summary.population = self.population.len();
        state.tick = tick;
        log::debug!(
            "tick {}: spawned {} moved {} stalled {} arrived {} expired {} alive {}",
            tick,
            summary.spawned,
            summary.moved,
            summary.stalled,
            summary.arrived,
            summary.expired,
            summary.population
        );
        Ok(summary)
    }
}

/// Cells of the site layer holding a finite, non-zero value, row-major.
pub fn site_cells(grid: &Grid, site: LayerId) -> Vec<Position> {
    let cols = grid.cols();
    grid.cells(site)
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, Some(x) if x.is_finite() && *x != 0.0))
        .map(|(i, _)| Position::new(i / cols, i % cols))
        .collect()
}

/// Twice the grid diagonal in cells, rounded up.
pub fn default_ttl(grid: &Grid) -> u32 {
    ((grid.diagonal() * DEFAULT_TTL_PER_DIAGONAL_CELL).ceil() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::grid::Bounds;

    fn grid_with(cost: f64, sites: &[(usize, usize)]) -> Grid {
        let mut grid = Grid::with_bounds(Bounds::new(5.0, 0.0, 5.0, 0.0), 5, 5).unwrap();
        grid.add_layer("cost", LayerInit::Fill(Some(cost)), false)
            .unwrap();
        grid.add_layer("sites", LayerInit::Fill(None), false).unwrap();
        for &(r, c) in sites {
            grid.set("sites", r, c, Some(1.0)).unwrap();
        }
        grid
    }

    fn names() -> LayerNames {
        LayerNames::new("sites", "cost", "pheromone")
    }

    #[test]
    fn test_new_creates_pheromone_layer() {
        let params = ColonyParams {
            min_pheromone: 0.5,
            ..Default::default()
        };
        let colony = Colony::new(grid_with(1.0, &[(2, 2)]), &names(), params).unwrap();
        assert_eq!(colony.sites(), &[Position::new(2, 2)]);
        assert_eq!(colony.grid().get("pheromone", 4, 4).unwrap(), Some(0.5));
        assert_eq!(colony.agent_ttl(), default_ttl(colony.grid()));
    }

    #[test]
    fn test_default_ttl_is_twice_the_diagonal() {
        let colony =
            Colony::new(grid_with(1.0, &[(2, 2)]), &names(), ColonyParams::default()).unwrap();
        // ceil(2 * sqrt(50))
        assert_eq!(colony.agent_ttl(), 15);

        let params = ColonyParams {
            agent_ttl: Some(4),
            ..Default::default()
        };
        let colony = Colony::new(grid_with(1.0, &[(2, 2)]), &names(), params).unwrap();
        assert_eq!(colony.agent_ttl(), 4);
    }

    #[test]
    fn test_missing_layers() {
        let grid = grid_with(1.0, &[(0, 0)]);
        let err = Colony::new(
            grid,
            &LayerNames::new("nope", "cost", "pheromone"),
            ColonyParams::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::Data);

        let grid = grid_with(1.0, &[(0, 0)]);
        let err = Colony::new(
            grid,
            &LayerNames::new("sites", "nope", "pheromone"),
            ColonyParams::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_empty_sites_is_data_error() {
        let err = Colony::new(grid_with(1.0, &[]), &names(), ColonyParams::default())
            .err()
            .unwrap();
        assert!(matches!(err, SimError::NoSites(_)));
    }

    #[test]
    fn test_zero_valued_site_cells_ignored() {
        let mut grid = grid_with(1.0, &[(1, 1)]);
        grid.set("sites", 3, 3, Some(0.0)).unwrap();
        let colony = Colony::new(grid, &names(), ColonyParams::default()).unwrap();
        assert_eq!(colony.sites(), &[Position::new(1, 1)]);
    }

    #[test]
    fn test_params_validation() {
        let bad = ColonyParams {
            min_pheromone: 5.0,
            max_pheromone: 1.0,
            ..Default::default()
        };
        assert_eq!(bad.validate().unwrap_err().kind(), ErrorKind::Config);

        let bad = ColonyParams {
            low_cost_limit: Some(3.0),
            high_cost_limit: Some(1.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = ColonyParams {
            random_weight: f64::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = ColonyParams {
            agent_ttl: Some(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(ColonyParams::default().validate().is_ok());
    }

    #[test]
    fn test_spawn_phase_round_robin() {
        let params = ColonyParams {
            max_population: 5,
            ..Default::default()
        };
        let mut colony = Colony::new(grid_with(1.0, &[(0, 0), (4, 4)]), &names(), params).unwrap();
        let mut state = SimulationState::new(3);
        assert_eq!(colony.spawn_phase(state.rng()).unwrap(), 5);
        assert_eq!(colony.population().len(), 5);
        let homes: Vec<_> = colony
            .population()
            .ids()
            .into_iter()
            .map(|id| colony.population().position(id).unwrap())
            .collect();
        assert_eq!(
            homes,
            vec![
                Position::new(0, 0),
                Position::new(4, 4),
                Position::new(0, 0),
                Position::new(4, 4),
                Position::new(0, 0)
            ]
        );
        // already full
        assert_eq!(colony.spawn_phase(state.rng()).unwrap(), 0);
    }

    #[test]
    fn test_spawn_phase_random_sites() {
        let params = ColonyParams {
            max_population: 20,
            site_selection: SiteSelection::Random,
            ..Default::default()
        };
        let sites = [(0, 0), (2, 3), (4, 1)];
        let mut colony = Colony::new(grid_with(1.0, &sites), &names(), params).unwrap();
        let mut state = SimulationState::new(9);
        colony.spawn_phase(state.rng()).unwrap();
        for id in colony.population().ids() {
            let pos = colony.population().position(id).unwrap();
            assert!(colony.is_site(pos));
        }
    }

    #[test]
    fn test_tick_respects_population_cap() {
        let params = ColonyParams {
            max_population: 7,
            agent_ttl: Some(3),
            ..Default::default()
        };
        let mut colony = Colony::new(grid_with(1.0, &[(2, 2)]), &names(), params).unwrap();
        let mut state = SimulationState::new(1);
        for expected_tick in 1..=10 {
            let summary = colony.tick(&mut state).unwrap();
            assert_eq!(summary.tick, expected_tick);
            assert!(summary.population <= 7);
            assert!(colony.population().len() <= 7);
        }
        assert_eq!(state.tick, 10);
    }

    #[test]
    fn test_parallel_and_serial_agree() {
        let run = |parallel: bool| {
            let params = ColonyParams {
                max_population: 12,
                agent_ttl: Some(6),
                parallel,
                ..Default::default()
            };
            let mut colony =
                Colony::new(grid_with(2.0, &[(0, 0), (4, 4)]), &names(), params).unwrap();
            let mut state = SimulationState::new(42);
            let summaries: Vec<_> = (0..15).map(|_| colony.tick(&mut state).unwrap()).collect();
            (summaries, colony.pheromone().unwrap())
        };
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn test_decay_phase_floors_pheromone() {
        let params = ColonyParams {
            min_pheromone: 1.0,
            half_life: 1.0,
            ..Default::default()
        };
        let mut colony = Colony::new(grid_with(1.0, &[(2, 2)]), &names(), params).unwrap();
        colony.grid_mut().set("pheromone", 0, 0, Some(3.0)).unwrap();
        colony.decay_phase();
        assert_eq!(colony.grid().get("pheromone", 0, 0).unwrap(), Some(1.5));
        colony.decay_phase();
        assert_eq!(colony.grid().get("pheromone", 0, 0).unwrap(), Some(1.0));
    }

    #[test]
    fn test_decay_phase_caps_pheromone() {
        let params = ColonyParams {
            max_pheromone: 10.0,
            half_life: 0.0,
            ..Default::default()
        };
        let mut colony = Colony::new(grid_with(1.0, &[(2, 2)]), &names(), params).unwrap();
        colony.grid_mut().set("pheromone", 0, 0, Some(1e9)).unwrap();
        colony.grid_mut().set("pheromone", 0, 1, Some(-4.0)).unwrap();
        colony.decay_phase();
        assert_eq!(colony.grid().get("pheromone", 0, 0).unwrap(), Some(10.0));
        assert_eq!(colony.grid().get("pheromone", 0, 1).unwrap(), Some(0.0));
    }
}
