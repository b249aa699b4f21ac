//! Resolution and dispatch benchmarks using criterion.
//!
//! Run with: cargo bench --bench resolve_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use understudy::{CallSignature, MatchEngine, Matcher, SetupRegistry, Substitute, Value, ValueKind};

fn lookup() -> CallSignature {
    CallSignature::new("Lookup", vec![ValueKind::Int], ValueKind::Int)
}

/// Benchmark resolution against registries of increasing size.
///
/// The probed key matches only the oldest setup, so every candidate is
/// evaluated.
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for size in [1usize, 16, 256] {
        let mut registry = SetupRegistry::new();
        registry.register(lookup(), vec![Matcher::any()]).unwrap();
        for k in 1..size as i64 {
            registry.register(lookup(), vec![Matcher::equal(k)]).unwrap();
        }
        let args = [Value::from(-1)];

        group.bench_with_input(BenchmarkId::new("worst_case", size), &size, |b, _| {
            let engine = MatchEngine::new(&registry);
            b.iter(|| black_box(engine.resolve_call(&lookup(), &args).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark a full locked dispatch through a substitute.
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("return_value", |b| {
        let sub = Substitute::named("bench");
        let h = sub.setup(lookup(), vec![Matcher::any()]).unwrap();
        sub.returns(h, 7).unwrap();
        let sig = lookup();
        b.iter(|| black_box(sub.intercept(&sig, vec![Value::from(1)]).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_dispatch);
criterion_main!(benches);
