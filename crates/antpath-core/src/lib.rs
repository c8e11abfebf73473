//! antpath core - ant colony optimization over layered grids
//!
//! Synthetic foragers wander a bounded grid, lay down a decaying pheromone
//! signal and are drawn toward cheap cells near target sites. Run long
//! enough, the pheromone layer traces least-effort corridors across the
//! cost landscape.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`grid`] | Bounds, step and named float-or-null layers; neighbours and decay |
//! | [`world`] | Agent population on a `hecs` arena, spawn/kill in roster order |
//! | [`agent`] | Generic agent operations: move, age, die, random walk |
//! | [`colony`] | Forager population bound to site/cost/pheromone layers; tick phases |
//! | [`forager`] | Candidate scoring, legality filter, commit and deposit |
//! | [`driver`] | Tick loop, run state and snapshot schedule |
//! | [`config`] | Resolved run configuration and output schedule |
//! | [`persistence`] | Layer store trait with memory and directory stores |
//! | [`sink`] | Progress message sinks |
//! | [`components`] | Per-agent components stored in the arena |
//! | [`error`] | `SimError` and its kinds |
//!
//! # Example
//!
//! ```rust,no_run
//! use antpath_core::prelude::*;
//!
//! # fn main() -> Result<(), SimError> {
//! let mut store = DirectoryStore::open("layers", StoreFormat::Binary)?;
//! let config = SimConfig {
//!     rounds: 500,
//!     output_rounds: 5,
//!     ..Default::default()
//! };
//! let mut sim = Simulation::prepare(config, &mut store)?;
//! let report = sim.run(&mut store, &mut LogSink)?;
//! println!("{} arrivals", report.arrived);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod colony;
pub mod components;
pub mod config;
pub mod driver;
pub mod error;
pub mod forager;
pub mod grid;
pub mod persistence;
pub mod sink;
pub mod world;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::agent::Liveness;
    pub use crate::colony::{Colony, ColonyParams, GoalPolicy, LayerNames, SiteSelection, TickSummary};
    pub use crate::components::Position;
    pub use crate::config::{OutputSchedule, SimConfig};
    pub use crate::driver::{RunReport, Simulation, SimulationState};
    pub use crate::error::{ErrorKind, SimError, SimResult};
    pub use crate::forager::{Decision, Step};
    pub use crate::grid::{Bounds, Connectivity, Grid, LayerData, LayerInit};
    pub use crate::persistence::{DirectoryStore, LayerStore, MemoryStore, StoreError, StoreFormat};
    pub use crate::sink::{LogSink, MessageSink, NullSink};
    pub use crate::world::{AgentId, AgentKind, Population};
}
