//! Coordinator drain benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use offsync_bench::random_entries;
use offsync_engine::strategies::{register_reference_strategies, LocalCache, MockBackend};
use offsync_engine::{EngineConfig, SyncCoordinator};
use offsync_storage::InMemoryStore;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn coordinator() -> SyncCoordinator<InMemoryStore> {
    let config = EngineConfig::new()
        .with_start_online(true)
        .with_drain_on_enqueue(false);
    let coordinator = SyncCoordinator::new(InMemoryStore::new(), config).unwrap();
    register_reference_strategies(
        &coordinator,
        Arc::new(MockBackend::new()),
        Arc::new(LocalCache::new()),
    );
    coordinator
}

/// Benchmark draining a full queue through the reference strategies.
fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinator_drain");
    let runtime = Runtime::new().unwrap();

    for size in [10, 100, 500].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let entries = random_entries(size);
            b.iter_batched(
                || {
                    let coordinator = coordinator();
                    for (data, _) in entries.iter().cloned() {
                        coordinator.sync_data(data).unwrap();
                    }
                    coordinator
                },
                |coordinator| {
                    let report = runtime.block_on(coordinator.process_queue());
                    black_box(report.processed_count);
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Benchmark the producer path: validate, prepare, persist.
fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinator_sync");
    let entries = random_entries(256);

    group.bench_function("sync_data", |b| {
        let coordinator = coordinator();
        let mut i = 0;
        b.iter(|| {
            let (data, _) = entries[i % entries.len()].clone();
            i += 1;
            black_box(coordinator.sync_data(data).unwrap());
            if i % 256 == 0 {
                coordinator.clear_all().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_drain, bench_sync);
criterion_main!(benches);
