use antpath_core::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn colony(size: usize, population: usize, parallel: bool) -> (Colony, SimulationState) {
    let extent = size as f64;
    let mut grid = Grid::with_bounds(Bounds::new(extent, 0.0, extent, 0.0), size, size)
        .expect("bench grid");
    let cost = (0..size * size)
        .map(|i| Some(1.0 + ((i % size) as f64 - extent / 2.0).abs() / extent))
        .collect();
    grid.add_layer("cost", LayerInit::Cells(cost), false)
        .expect("cost layer");
    grid.add_layer("sites", LayerInit::Fill(None), false)
        .expect("site layer");
    grid.set("sites", size / 2, 0, Some(1.0)).expect("site");
    grid.set("sites", size / 2, size - 1, Some(1.0)).expect("site");

    let params = ColonyParams {
        max_population: population,
        parallel,
        ..Default::default()
    };
    let colony = Colony::new(grid, &LayerNames::new("sites", "cost", "pheromone"), params)
        .expect("bench colony");
    (colony, SimulationState::new(0xA17))
}

fn bench_colony_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("colony_tick");
    group.sample_size(20);
    for &(size, population) in &[(64usize, 400usize), (256, 2000)] {
        for parallel in [false, true] {
            let label = if parallel { "par" } else { "seq" };
            group.bench_function(format!("{}x{}_{}ants_{}", size, size, population, label), |b| {
                b.iter_batched(
                    || colony(size, population, parallel),
                    |(mut colony, mut state)| {
                        for _ in 0..16 {
                            colony.tick(&mut state).expect("tick");
                        }
                        colony
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_decay(c: &mut Criterion) {
    let (mut colony, _) = colony(512, 1, true);
    c.bench_function("decay_512x512", |b| b.iter(|| colony.decay_phase()));
}

criterion_group!(benches, bench_colony_ticks, bench_decay);
criterion_main!(benches);
