//! antpath headless harness
//!
//! Runs colonies against a directory of layer files, builds a synthetic
//! demo landscape, or sweeps the built-in validation scenarios.
//!
//! Usage:
//!   cargo run -p antpath-sim -- run --config run.json --store layers/
//!   cargo run -p antpath-sim -- demo --store /tmp/antpath --rounds 400
//!   cargo run -p antpath-sim -- validate --verbose

mod landscape;
mod validate;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use antpath_core::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "antpath-sim",
    version,
    about = "Ant colony optimization over layered grids"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation described by a JSON config file.
    Run {
        /// JSON file holding the run configuration.
        #[arg(short, long)]
        config: PathBuf,
        /// Directory the input layers are read from and outputs written to.
        #[arg(short, long)]
        store: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Binary)]
        format: FormatArg,
    },
    /// Write a synthetic valley landscape into a store and run it.
    Demo {
        #[arg(short, long)]
        store: PathBuf,
        #[arg(long, default_value_t = 24)]
        rows: usize,
        #[arg(long, default_value_t = 48)]
        cols: usize,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long, default_value_t = 300)]
        rounds: u64,
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
    },
    /// Run the built-in scenario sweep.
    Validate {
        /// Print every check, not only failures.
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Binary,
    Json,
}

impl From<FormatArg> for StoreFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Binary => StoreFormat::Binary,
            FormatArg::Json => StoreFormat::Json,
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            store,
            format,
        } => run_command(&config, &store, format.into()),
        Command::Demo {
            store,
            rows,
            cols,
            seed,
            rounds,
            format,
        } => demo_command(&store, rows, cols, seed, rounds, format.into()),
        Command::Validate { verbose } => validate_command(verbose),
    }
}

fn load_config(path: &Path) -> Result<SimConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    SimConfig::from_json(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn run_command(config: &Path, store: &Path, format: StoreFormat) -> Result<()> {
    let config = load_config(config)?;
    let mut store = DirectoryStore::open(store, format)
        .with_context(|| format!("failed to open layer store {}", store.display()))?;
    let mut sim = Simulation::prepare(config, &mut store).context("failed to prepare simulation")?;
    let report = sim
        .run(&mut store, &mut LogSink)
        .context("simulation run failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn demo_command(
    root: &Path,
    rows: usize,
    cols: usize,
    seed: u64,
    rounds: u64,
    format: StoreFormat,
) -> Result<()> {
    if rows < 4 || cols < 4 {
        bail!("demo landscape needs at least 4x4 cells, got {}x{}", rows, cols);
    }
    let mut store = DirectoryStore::open(root, format)
        .with_context(|| format!("failed to open layer store {}", root.display()))?;
    let land = landscape::valley(rows, cols);
    store.save_layer("demo_sites", &land.sites)?;
    store.save_layer("demo_cost", &land.cost)?;

    let mut config = SimConfig {
        site_layer: "demo_sites".into(),
        cost_layer: "demo_cost".into(),
        output_name: "demo_pheromone".into(),
        overwrite_pheromone: true,
        rounds,
        output_rounds: 4,
        seed,
        ..Default::default()
    };
    config.colony.max_population = (rows * cols / 8).max(10);

    let mut sim = Simulation::prepare(config, &mut store).context("failed to prepare demo")?;
    for &site in sim.colony().sites() {
        if let Some((northing, easting)) = sim.colony().grid().cell_center(site) {
            println!(
                "site at cell ({}, {}) -> N {:.1} E {:.1}",
                site.row, site.col, northing, easting
            );
        }
    }
    let report = sim.run(&mut store, &mut LogSink).context("demo run failed")?;

    let pheromone = sim.colony().pheromone()?;
    println!("{}", landscape::render(&pheromone));
    println!(
        "{} ticks, {} arrivals, {} expired; layers written to {}",
        report.ticks,
        report.arrived,
        report.expired,
        store.root().display()
    );
    Ok(())
}

fn validate_command(verbose: bool) -> Result<()> {
    println!("=== antpath Validation Harness ===\n");
    let results = validate::run_all(verbose);

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
