//! Tick driver.
//!
//! [`Simulation`] is a sequencing loop: it loads the input layers through a
//! [`LayerStore`], builds the grid and colony, then runs `rounds` colony
//! ticks and hands the pheromone layer back to the store, either once at the
//! end or progressively as `{output_name}_{tick}` snapshots plus the final
//! layer. The only run state it keeps is [`SimulationState`].

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::colony::{Colony, TickSummary};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::grid::{Grid, LayerData};
use crate::persistence::{LayerStore, StoreError};
use crate::sink::MessageSink;

/// Counters and random stream threaded through every tick.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Ticks completed so far.
    pub tick: u64,
    pub seed: u64,
    /// Layers handed to the store so far.
    pub snapshots: u32,
    rng: ChaCha8Rng,
}

impl SimulationState {
    pub fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            seed,
            snapshots: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Stream used for serial draws such as random site selection.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// Totals for one call to [`Simulation::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub ticks: u64,
    pub spawned: usize,
    pub moved: usize,
    pub stalled: usize,
    pub arrived: usize,
    pub expired: usize,
    /// Live foragers when the run ended.
    pub population: usize,
    /// Progressive snapshot names, in save order.
    pub snapshots: Vec<String>,
    /// Name the final pheromone layer was saved under.
    pub output: String,
}

impl RunReport {
    fn absorb(&mut self, summary: &TickSummary) {
        self.ticks += 1;
        self.spawned += summary.spawned;
        self.moved += summary.moved;
        self.stalled += summary.stalled;
        self.arrived += summary.arrived;
        self.expired += summary.expired;
        self.population = summary.population;
    }
}

pub struct Simulation {
    config: SimConfig,
    colony: Colony,
    state: SimulationState,
}

impl Simulation {
    /// Wrap an already built colony.
    pub fn new(config: SimConfig, colony: Colony) -> Self {
        let state = SimulationState::new(config.seed);
        Self {
            config,
            colony,
            state,
        }
    }

    /// Load the input layers from `store` and build the colony.
    ///
    /// The grid takes its bounds and step from the site layer. A seed
    /// pheromone layer, if configured, is copied in under `output_name`.
    pub fn prepare<S: LayerStore + ?Sized>(config: SimConfig, store: &mut S) -> SimResult<Self> {
        config.validate()?;

        let site = load(store, &config.site_layer, SimError::MissingSiteLayer)?;
        let mut grid =
            Grid::with_bounds(site.bounds, site.rows, site.cols)?.with_connectivity(config.connectivity);
        grid.import_layer(&config.site_layer, site, false)?;

        let cost = load(store, &config.cost_layer, SimError::MissingLayer)?;
        grid.import_layer(&config.cost_layer, cost, config.overwrite_cost)?;

        if let Some(seed_layer) = &config.pheromone_layer {
            let pheromone = load(store, seed_layer, SimError::MissingLayer)?;
            grid.import_layer(&config.output_name, pheromone, false)?;
        }

        let colony = Colony::new(grid, &config.layer_names(), config.colony.clone())?;
        log::info!(
            "prepared {}x{} grid with {} sites, ttl {}, seed {}",
            colony.grid().rows(),
            colony.grid().cols(),
            colony.sites().len(),
            colony.agent_ttl(),
            config.seed
        );
        Ok(Self::new(config, colony))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn colony(&self) -> &Colony {
        &self.colony
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Run a single colony tick without any output.
    pub fn step(&mut self) -> SimResult<TickSummary> {
        self.colony.tick(&mut self.state)
    }

    /// Run `rounds` ticks and save the pheromone layer on schedule.
    ///
    /// Every output name is checked against the store before the first
    /// tick, so a conflict leaves both the store and the colony untouched.
    pub fn run<S, M>(&mut self, store: &mut S, sink: &mut M) -> SimResult<RunReport>
    where
        S: LayerStore + ?Sized,
        M: MessageSink + ?Sized,
    {
        if !self.config.overwrite_pheromone {
            let outputs = self.config.output_names(self.state.tick);
            if let Some(name) = outputs.into_iter().find(|name| store.contains(name)) {
                return Err(SimError::LayerExists(name));
            }
        }

        let schedule = self.config.schedule();
        sink.emit(&format!(
            "starting {} rounds from tick {}: {} sites, max population {}, output `{}`",
            self.config.rounds,
            self.state.tick,
            self.colony.sites().len(),
            self.colony.params().max_population,
            self.config.output_name
        ));

        let mut report = RunReport::default();
        for _ in 0..self.config.rounds {
            let summary = self.colony.tick(&mut self.state)?;
            report.absorb(&summary);
            if schedule.is_due(summary.tick) {
                let name = self.config.snapshot_name(summary.tick);
                self.save(store, &name)?;
                sink.emit(&format!(
                    "tick {}: saved `{}` ({} foragers alive)",
                    summary.tick, name, summary.population
                ));
                report.snapshots.push(name);
            }
        }
        if report.ticks == 0 {
            report.population = self.colony.population().len();
        }

        let output = self.config.output_name.clone();
        self.save(store, &output)?;
        report.output = output;
        sink.emit(&format!(
            "finished at tick {}: {} moves, {} arrivals, {} expired; saved `{}`",
            self.state.tick, report.moved, report.arrived, report.expired, report.output
        ));
        Ok(report)
    }

    fn save<S: LayerStore + ?Sized>(&mut self, store: &mut S, name: &str) -> SimResult<()> {
        let layer = self.colony.pheromone()?;
        store.save_layer(name, &layer)?;
        self.state.snapshots += 1;
        log::debug!("saved pheromone layer as `{}`", name);
        Ok(())
    }
}

fn load<S: LayerStore + ?Sized>(
    store: &mut S,
    name: &str,
    missing: fn(String) -> SimError,
) -> SimResult<LayerData> {
    match store.load_layer(name) {
        Ok(layer) => Ok(layer),
        Err(StoreError::NotFound(name)) => Err(missing(name)),
        Err(err) => Err(err.into()),
    }
}
