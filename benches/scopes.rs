use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ferrous_scopes::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_store_hit(c: &mut Criterion) {
    let store = ObjectStore::new();
    let factory = FnFactory::new(|_| 42u64).with_stable_id("answer").into_arc();

    // Prime the entry
    store.get_or_create(&factory, Context::empty()).unwrap();

    c.bench_function("store_hit_u64", |b| {
        b.iter(|| {
            let v = store.get_or_create(&factory, Context::empty()).unwrap();
            black_box(v);
        })
    });
}

fn bench_store_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    let factory = FnFactory::new(|_| ExpensiveToCreate {
        data: (0..1000).collect(),
    })
    .into_arc();

    c.bench_function("store_cold_expensive", |b| {
        b.iter_batched(
            ObjectStore::new,
            |store| {
                let v = store.get_or_create_typed::<ExpensiveToCreate>(&factory, Context::empty()).unwrap();
                black_box(v.data.len());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_identity_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity_resolution");
    let cache = IdentityCache::new();

    let stable = FnFactory::new(|_| 0u8).with_stable_id("stable");
    let by_type = FnFactory::new(|_| 0u16);

    group.bench_function("stable_id", |b| b.iter(|| black_box(cache.resolve(&stable).unwrap())));
    group.bench_function("type_name", |b| b.iter(|| black_box(cache.resolve(&by_type).unwrap())));
    group.finish();
}

// ===== Macro Benchmarks =====

fn bench_directory_touch(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_touch");

    for capacity in [1usize, 25, 250] {
        let directory = ScopeDirectory::new(capacity).unwrap();
        let scopes: Vec<ScopeId> = (0..capacity).map(|i| ScopeId::from(format!("view-{i}"))).collect();
        for scope in &scopes {
            directory.store_for(scope);
        }

        group.bench_with_input(BenchmarkId::new("hit", capacity), &scopes, |b, scopes| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % scopes.len();
                black_box(directory.store_for(&scopes[i]));
            })
        });
    }

    group.finish();
}

fn bench_eviction_churn(c: &mut Criterion) {
    let factory = FnFactory::new(|_| vec![0u8; 256])
        .with_stable_id("buffer")
        .on_destroy(|buffer, _| {
            black_box(buffer.len());
            Ok(())
        })
        .into_arc();

    c.bench_function("eviction_churn_capacity_25", |b| {
        let directory = ScopeDirectory::new(25).unwrap();
        let mut next = 0u64;
        b.iter(|| {
            next += 1;
            let store = directory.store_for(format!("view-{next}"));
            black_box(store.get_or_create(&factory, Context::empty()).unwrap());
        })
    });
}

criterion_group!(
    micro_benches,
    bench_store_hit,
    bench_store_cold,
    bench_identity_resolution
);

criterion_group!(macro_benches, bench_directory_touch, bench_eviction_churn);

criterion_main!(micro_benches, macro_benches);
