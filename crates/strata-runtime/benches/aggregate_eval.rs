//! Benchmark: composite aggregate evaluation
//!
//! # Background
//!
//! A composite's label is never stored. Every `evaluate_aggregate_state`
//! clones the child list under a read lock and classifies each child,
//! and a nested composite evaluates itself while being classified.
//! Machines do the same over their composites on every evaluation.
//!
//! This measures the cost of that re-derivation against a cached label,
//! for flat composites and for a two-level hierarchy.
//!
//! # When to revisit
//!
//! - If evaluation starts running on a hot path (per routed call)
//! - If composites grow past a few hundred children
//! - If classification gains work beyond reading the lifecycle state

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata_component::Component;
use strata_runtime::{Composite, Runtime};
use std::sync::Arc;

fn flat(runtime: &Runtime, children: usize) -> Arc<Composite> {
    let composite = runtime.create_composite("flat", None).unwrap();
    for i in 0..children {
        let name = format!("leaf-{i}");
        let leaf = runtime.create_leaf(&name, Some(&composite.id())).unwrap();
        composite.add(name, leaf).unwrap();
    }
    composite.activate().unwrap();
    composite
}

fn bench_flat_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_evaluate_flat");
    let runtime = Runtime::default();

    for count in [10, 100, 500] {
        group.throughput(Throughput::Elements(count as u64));
        let composite = flat(&runtime, count);

        group.bench_with_input(BenchmarkId::new("evaluate", count), &count, |b, _| {
            b.iter(|| black_box(composite.evaluate_aggregate_state()));
        });

        // Cached label read, for comparison
        group.bench_with_input(BenchmarkId::new("last_state", count), &count, |b, _| {
            b.iter(|| black_box(composite.last_state()));
        });
    }

    group.finish();
}

fn bench_nested_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_evaluate_nested");
    let runtime = Runtime::default();

    // 10 inner composites of 10 leaves each
    let outer = runtime.create_composite("outer", None).unwrap();
    for i in 0..10 {
        let name = format!("inner-{i}");
        let inner = runtime.create_composite(&name, Some(&outer.id())).unwrap();
        for j in 0..10 {
            let leaf_name = format!("leaf-{j}");
            let leaf = runtime.create_leaf(&leaf_name, Some(&inner.id())).unwrap();
            inner.add(leaf_name, leaf).unwrap();
        }
        outer.add(name, inner).unwrap();
    }
    outer.activate().unwrap();

    group.bench_function("10x10", |b| {
        b.iter(|| black_box(outer.evaluate_aggregate_state()));
    });

    group.finish();
}

criterion_group!(benches, bench_flat_evaluation, bench_nested_evaluation);
criterion_main!(benches);
