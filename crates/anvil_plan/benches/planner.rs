//! Planner benchmarks over the bundled crafting rules.

use anvil_core::{RuleSet, Task};
use anvil_plan::{Compiler, Planner};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const CRAFTING: &str = include_str!("../../../data/crafting.json");

fn bench_compile(c: &mut Criterion) {
    let rules = RuleSet::from_json_str(CRAFTING).expect("bundled rules parse");
    c.bench_function("compile_crafting", |b| {
        b.iter(|| Compiler::new().compile(black_box(&rules)))
    });
}

fn bench_plan(c: &mut Criterion) {
    let rules = RuleSet::from_json_str(CRAFTING).expect("bundled rules parse");
    let domain = Compiler::new().compile(&rules).expect("bundled rules compile").domain;

    let from_scratch = rules.initial_state("agent", 300);
    let plank = [Task::have_enough("agent", "plank", 1)];
    c.bench_function("plan_plank_from_scratch", |b| {
        b.iter(|| Planner::new(&domain).plan(black_box(&from_scratch), &plank))
    });

    let stocked = rules
        .initial_state("agent", 10)
        .with_quantity("plank", 3)
        .with_quantity("stick", 2);
    let pickaxe = [Task::have_enough("agent", "wooden_pickaxe", 1)];
    c.bench_function("plan_wooden_pickaxe", |b| {
        b.iter(|| Planner::new(&domain).plan(black_box(&stocked), &pickaxe))
    });
}

criterion_group!(benches, bench_compile, bench_plan);
criterion_main!(benches);
