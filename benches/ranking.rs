//! Performance benchmarks for ranking and graph construction.
//!
//! Run with: `cargo bench --bench ranking`
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | Select | One pass over provider combinations |
//! | Build | One flow graph per (unit, threshold) |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::BTreeMap;

use textual_flow::{
    Combination, CombinationRanker, FlowGraphBuilder, NominalParent, ParentCandidate, ParentMap,
    Threshold, VariantUnit, WitnessId, WitnessRow,
};

/// Deterministic pseudo-random combinations.
fn make_combinations(n: usize) -> Vec<Combination> {
    (0..n)
        .map(|i| {
            let width = 1 + i % 3;
            Combination::new(
                (0..width)
                    .map(|j| {
                        let seed = i * 31 + j * 17;
                        ParentCandidate::new(format!("P{}", seed % 97), (seed % 50) as i32 + 1, (seed % 3) as u32 + 1)
                    })
                    .collect(),
            )
        })
        .collect()
}

/// A chain of `n` witnesses, each descended from the previous one.
fn make_unit(n: usize, threshold: Threshold) -> (Vec<WitnessRow>, BTreeMap<WitnessId, ParentMap>) {
    let mut rows = vec![WitnessRow::new("A", "a", NominalParent::Absent)];
    let mut maps = BTreeMap::new();

    for i in 1..n {
        let witness = format!("P{}", i);
        let parent = if i == 1 { "A".to_string() } else { format!("P{}", i - 1) };
        let reading = ((b'a' + (i % 26) as u8) as char).to_string();
        rows.push(WitnessRow::new(witness.as_str(), reading, NominalParent::Initial));

        let mut map = ParentMap::new();
        map.insert(threshold, Combination::new(vec![ParentCandidate::new(parent, (i % 4) as i32 + 1, 1)]));
        maps.insert(WitnessId::from(witness), map);
    }

    (rows, maps)
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    let ranker = CombinationRanker::default();

    for n in [10, 100, 1000] {
        let combinations = make_combinations(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &combinations, |b, combinations| {
            b.iter(|| ranker.select(black_box(combinations), &NominalParent::Absent))
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let builder = FlowGraphBuilder::new(false);
    let unit = VariantUnit::from("B04K1V1/2");
    let threshold = Threshold::new(499).unwrap();

    for n in [10, 100, 500] {
        let (rows, maps) = make_unit(n, threshold);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &(rows, maps), |b, (rows, maps)| {
            b.iter(|| builder.build(&unit, threshold, black_box(rows), black_box(maps)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_select, bench_build);
criterion_main!(benches);
