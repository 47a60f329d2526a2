//! Planning benchmarks for producer_core.
//!
//! Run with: `cargo bench -p producer_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use producer_core::prelude::*;
use producer_test_utils::fixtures::{catalog, midgame_snapshot, opening_snapshot, planner, unit_type};
use producer_test_utils::world::FakeWorld;

/// Plans an opening build and a mid-game army tick.
pub fn plan_tick_benchmark(c: &mut Criterion) {
    let planner = planner();
    let catalog = catalog();
    let race = *catalog.race();
    let gateway = unit_type(&catalog, "Protoss_Gateway");
    let zealot = unit_type(&catalog, "Protoss_Zealot");
    let dragoon = unit_type(&catalog, "Protoss_Dragoon");

    let opening = opening_snapshot(&catalog, 50);
    let opening_goals: Vec<ProductionGoal> = vec![
        UnitGoal::new(race.worker, 8).into(),
        UnitGoal::new(race.supply_provider, 1).into(),
        UnitGoal::new(gateway, 1).into(),
        UnitGoal::new(zealot, 2).into(),
    ];
    c.bench_function("plan_opening", |b| {
        b.iter(|| planner.plan(black_box(&opening), black_box(&opening_goals), &[]))
    });

    let midgame = midgame_snapshot(&catalog);
    let army_goals: Vec<ProductionGoal> = vec![
        UnitGoal::new(race.worker, 4).into(),
        UnitGoal::unlimited(dragoon).into(),
        UnitGoal::unlimited(zealot).into(),
    ];
    c.bench_function("plan_tick_midgame", |b| {
        b.iter(|| {
            let mut world = FakeWorld::from_snapshot(&midgame);
            planner.plan_tick(&mut world.collaborators(), black_box(&army_goals), &[])
        })
    });
}

criterion_group!(benches, plan_tick_benchmark);
criterion_main!(benches);
