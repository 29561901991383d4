use criterion::{black_box, criterion_group, criterion_main, Criterion};
use enclear::{run_stress, ClearingEngine, ClearingMethod, ShockConfig, SolverOptions};
use nalgebra::{DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Random network where each directed pair carries a liability with probability `density`.
fn random_engine(nodes: usize, density: f64, seed: u64) -> ClearingEngine {
    let mut rng = SmallRng::seed_from_u64(seed);
    let assets = DVector::from_fn(nodes, |_, _| rng.gen_range(0.0..20.0));
    let liabilities = DMatrix::from_fn(nodes, nodes, |i, j| {
        if i != j && rng.gen_bool(density) {
            rng.gen_range(1.0..100.0)
        } else {
            0.0
        }
    });
    ClearingEngine::new(assets, liabilities).expect("square network")
}

fn bench_standard_100_nodes(c: &mut Criterion) {
    let engine = random_engine(100, 0.1, 7);
    let options = SolverOptions::default();

    c.bench_function("standard_100_nodes", |b| {
        b.iter(|| engine.solve(black_box(&options)))
    });
}

fn bench_iterate_100_nodes(c: &mut Criterion) {
    let engine = random_engine(100, 0.1, 7);
    let options = SolverOptions::new(ClearingMethod::Iterate, 10_000, 1e-8);

    c.bench_function("iterate_100_nodes", |b| {
        b.iter(|| engine.solve(black_box(&options)))
    });
}

fn bench_stress_50_nodes(c: &mut Criterion) {
    let engine = random_engine(50, 0.2, 11);
    let config = ShockConfig::default().with_scenarios(200).with_volatility(0.5);

    c.bench_function("stress_50_nodes_200_scenarios", |b| {
        b.iter(|| run_stress(black_box(&engine), black_box(&config)))
    });
}

criterion_group!(
    benches,
    bench_standard_100_nodes,
    bench_iterate_100_nodes,
    bench_stress_50_nodes
);
criterion_main!(benches);
