//! Built-in scenario sweep.
//!
//! Each check builds a small grid in memory, drives the kernel and reports a
//! [`TestResult`]. Nothing touches the disk.

use anyhow::{Context, Result};
use antpath_core::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Run one check, turning an error into a failed result.
fn check(name: &str, body: impl FnOnce() -> Result<(bool, String)>) -> TestResult {
    let (passed, detail) = match body() {
        Ok(outcome) => outcome,
        Err(err) => (false, format!("error: {:#}", err)),
    };
    TestResult {
        name: name.to_string(),
        passed,
        detail,
    }
}

fn square_grid(size: usize, cost: Vec<Option<f64>>, sites: &[(usize, usize)]) -> Result<Grid> {
    let extent = size as f64;
    let mut grid = Grid::with_bounds(Bounds::new(extent, 0.0, extent, 0.0), size, size)?;
    grid.add_layer("cost", LayerInit::Cells(cost), false)?;
    grid.add_layer("sites", LayerInit::Fill(None), false)?;
    for &(r, c) in sites {
        grid.set("sites", r, c, Some(1.0))?;
    }
    Ok(grid)
}

fn names() -> LayerNames {
    LayerNames::new("sites", "cost", "pheromone")
}

pub fn run_all(verbose: bool) -> Vec<TestResult> {
    let mut results = Vec::new();
    results.extend(validate_decay(verbose));
    results.extend(validate_forager(verbose));
    results.extend(validate_population(verbose));
    results.extend(validate_driver(verbose));
    results
}

// ── 1. Decay ────────────────────────────────────────────────────────────

fn validate_decay(verbose: bool) -> Vec<TestResult> {
    println!("--- Pheromone Decay ---");
    let mut results = Vec::new();

    results.push(check("decay_bounded_and_converges", || {
        let start: Vec<Option<f64>> = (0..64).map(|i| Some(1.0 + i as f64 * 37.5)).collect();
        let mut grid = square_grid(8, start.clone(), &[])?;
        let id = grid.require("cost")?;
        let floor = 1.0;

        let mut previous = start;
        let mut steps = 0;
        while steps < 5000 {
            grid.decay(id, 10.0, floor, true);
            let now = grid.cells(id).to_vec();
            let bounded = now.iter().zip(&previous).all(|(v, p)| match (v, p) {
                (Some(v), Some(p)) => *v >= floor && v <= p,
                _ => false,
            });
            if !bounded {
                return Ok((false, format!("bound broken at step {}", steps + 1)));
            }
            steps += 1;
            if now.iter().all(|v| *v == Some(floor)) {
                break;
            }
            previous = now;
        }
        if verbose {
            println!("  converged to floor after {} steps", steps);
        }
        Ok((steps < 5000, format!("floor reached after {} steps", steps)))
    }));

    results.push(check("decay_frozen_half_life", || {
        let start: Vec<Option<f64>> = (0..16).map(|i| Some(i as f64)).collect();
        let mut grid = square_grid(4, start.clone(), &[])?;
        let id = grid.require("cost")?;
        grid.decay(id, 0.0, 0.0, false);
        grid.decay(id, -3.0, 0.0, true);
        Ok((grid.cells(id) == start.as_slice(), "half_life <= 0 leaves the layer unchanged".into()))
    }));

    results
}

// ── 2. Forager decisions ────────────────────────────────────────────────

fn validate_forager(_verbose: bool) -> Vec<TestResult> {
    println!("--- Forager Decisions ---");
    let mut results = Vec::new();

    results.push(check("forager_negative_cost_scenario", || {
        let mut cost = vec![Some(0.0); 9];
        cost[0] = Some(-1.0);
        let params = ColonyParams {
            low_cost_limit: Some(-1.0),
            high_cost_limit: Some(-1.0),
            ..Default::default()
        };
        let mut colony = Colony::new(square_grid(3, cost, &[(1, 1)])?, &names(), params)?;
        let population = colony.population_mut();
        let id = population.spawn(10, Position::new(1, 1))?;
        population.set_position(id, Position::new(0, 1));
        population.with_forager(id, |state| state.departed = true);

        let candidates = [Position::new(0, 0), Position::new(1, 1)];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let decision = colony.decide_among(id, &candidates, &mut rng)?;
        Ok((
            decision.next_step == Some(Position::new(0, 0)),
            format!("next_step = {:?}", decision.next_step),
        ))
    }));

    results.push(check("forager_stall_only_ages", || {
        let params = ColonyParams {
            low_cost_limit: Some(-5.0),
            high_cost_limit: Some(-5.0),
            ..Default::default()
        };
        let mut colony =
            Colony::new(square_grid(3, vec![Some(0.0); 9], &[(1, 1)])?, &names(), params)?;
        let id = colony.population_mut().spawn(5, Position::new(1, 1))?;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let decision = colony.decide(id, &mut rng)?;
        let stalled = decision.next_step.is_none();
        let commit = colony.commit(id, decision)?;
        let stayed = colony.population().position(id) == Some(Position::new(1, 1));
        let aged = colony.population().ttl(id) == Some(4);
        Ok((
            stalled && commit.step == Step::Stalled && stayed && aged,
            format!("stalled={} stayed={} aged={}", stalled, stayed, aged),
        ))
    }));

    results.push(check("forager_legality_sweep", || {
        let mut illegal = 0;
        let mut decisions = 0;
        for seed in 0..200u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let cost: Vec<Option<f64>> = (0..25)
                .map(|i| Some(((i * 7 + seed as usize) % 5) as f64 - 2.0))
                .collect();
            let params = ColonyParams {
                low_cost_limit: Some(-1.0),
                high_cost_limit: Some(1.0),
                ..Default::default()
            };
            let mut colony = Colony::new(square_grid(5, cost.clone(), &[(2, 2)])?, &names(), params)?;
            let id = colony.population_mut().spawn(10, Position::new(2, 2))?;
            let decision = colony.decide(id, &mut rng)?;
            if let Some(next) = decision.next_step {
                decisions += 1;
                let c = cost[next.row * 5 + next.col].unwrap_or(f64::NAN);
                if !(-1.0..=1.0).contains(&c) {
                    illegal += 1;
                }
            }
        }
        Ok((
            illegal == 0,
            format!("{} moves, {} outside the cost band", decisions, illegal),
        ))
    }));

    results
}

// ── 3. Population ───────────────────────────────────────────────────────

fn validate_population(_verbose: bool) -> Vec<TestResult> {
    println!("--- Population ---");
    let mut results = Vec::new();

    results.push(check("population_cap", || {
        let params = ColonyParams {
            max_population: 25,
            agent_ttl: Some(5),
            ..Default::default()
        };
        let grid = square_grid(10, vec![Some(1.0); 100], &[(0, 0), (9, 9)])?;
        let mut colony = Colony::new(grid, &names(), params)?;
        let mut state = SimulationState::new(7);
        let mut peak = 0;
        for _ in 0..100 {
            let summary = colony.tick(&mut state)?;
            peak = peak.max(summary.population);
        }
        Ok((peak <= 25, format!("peak population {} of 25", peak)))
    }));

    results.push(check("agent_mortality", || {
        let grid = square_grid(6, vec![Some(1.0); 36], &[])?;
        let mut population = Population::new(grid, AgentKind::Walker);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for ttl in 1..=20 {
            population.spawn(ttl, Position::new(3, 3))?;
        }
        let mut ticks = 0;
        while !population.is_empty() && ticks < 100 {
            population.step_walkers(&mut rng);
            ticks += 1;
        }
        Ok((
            population.is_empty() && ticks == 20,
            format!("last walker gone after {} steps", ticks),
        ))
    }));

    results
}

// ── 4. Driver ───────────────────────────────────────────────────────────

fn demo_store() -> Result<MemoryStore> {
    let land = crate::landscape::valley(12, 18);
    let mut store = MemoryStore::new();
    store.save_layer("sites", &land.sites)?;
    store.save_layer("cost", &land.cost)?;
    Ok(store)
}

fn validate_driver(verbose: bool) -> Vec<TestResult> {
    println!("--- Driver ---");
    let mut results = Vec::new();

    results.push(check("driver_zero_rounds", || {
        let mut store = demo_store()?;
        let before = (store.get("sites").cloned(), store.get("cost").cloned());
        let config = SimConfig {
            rounds: 0,
            ..Default::default()
        };
        let mut sim = Simulation::prepare(config, &mut store)?;
        let report = sim.run(&mut store, &mut NullSink)?;
        let after = (store.get("sites").cloned(), store.get("cost").cloned());
        let untouched = store
            .get("pheromone")
            .map(|l| l.cells.iter().all(|v| *v == Some(0.0)))
            .unwrap_or(false);
        Ok((
            report.ticks == 0 && before == after && untouched,
            "inputs and pheromone unchanged".into(),
        ))
    }));

    results.push(check("driver_determinism", || {
        let run = || -> Result<(RunReport, LayerData)> {
            let mut store = demo_store()?;
            let config = SimConfig {
                rounds: 60,
                output_rounds: 3,
                seed: 1234,
                ..Default::default()
            };
            let mut sim = Simulation::prepare(config, &mut store)?;
            let report = sim.run(&mut store, &mut NullSink)?;
            let layer = store
                .get("pheromone")
                .cloned()
                .context("final pheromone layer missing")?;
            Ok((report, layer))
        };
        let (a, layer_a) = run()?;
        let (b, layer_b) = run()?;
        if verbose {
            println!(
                "  {} moves, {} arrivals, {} expired over {} ticks",
                a.moved, a.arrived, a.expired, a.ticks
            );
        }
        Ok((
            a == b && layer_a == layer_b,
            format!("{} snapshots, {} arrivals", a.snapshots.len(), a.arrived),
        ))
    }));

    results.push(check("driver_conflict_before_mutation", || {
        let mut store = demo_store()?;
        let config = SimConfig {
            rounds: 10,
            ..Default::default()
        };
        let mut sim = Simulation::prepare(config.clone(), &mut store)?;
        sim.run(&mut store, &mut NullSink)?;
        let saved = store.get("pheromone").cloned();

        let mut again = Simulation::prepare(config, &mut store)?;
        let conflict = match again.run(&mut store, &mut NullSink) {
            Err(err) => err.kind() == ErrorKind::Conflict,
            Ok(_) => false,
        };
        let unchanged = store.get("pheromone").cloned() == saved && again.state().tick == 0;
        Ok((
            conflict && unchanged,
            format!("conflict={} unchanged={}", conflict, unchanged),
        ))
    }));

    results
}
