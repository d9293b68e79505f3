//! Performance benchmarks for the data cache.
//!
//! These benchmarks measure:
//! - Freshness checks and reads on a populated cache
//! - Store/invalidate cycles
//! - Cached loads through the resource service
//! - Write fan-out with many scoped keys

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use track_data_cache::{
    CacheKey, DataCache, EntityId, Resource, ResourceCache, ResourceService, StaticDataSource,
};

const TTL: Duration = Duration::from_secs(300);

fn practices_for(athlete: usize) -> CacheKey {
    CacheKey::new(Resource::Practices)
        .with("athlete", EntityId::new(format!("a{}", athlete)).unwrap()).unwrap()
}

fn populated_cache(size: usize) -> DataCache<CacheKey, serde_json::Value> {
    let cache = DataCache::new(TTL);
    for i in 0..size {
        cache.set_data(&practices_for(i), json!([{"id": i}]));
    }
    cache
}

/// Benchmark is_valid and get on hot keys.
fn bench_fresh_reads(c: &mut Criterion) {
    let cache = populated_cache(1_000);
    let key = practices_for(500);

    c.bench_function("is_valid_hit", |b| {
        b.iter(|| black_box(cache.is_valid(&key)));
    });

    c.bench_function("get_hit", |b| {
        b.iter(|| black_box(cache.get(&key)));
    });

    let missing = practices_for(5_000);
    c.bench_function("is_valid_missing", |b| {
        b.iter(|| black_box(cache.is_valid(&missing)));
    });
}

/// Benchmark a store followed by an invalidation of the same key.
fn bench_set_and_invalidate(c: &mut Criterion) {
    let cache = populated_cache(100);
    let key = practices_for(7);
    let value = json!([{"id": 7, "focus": "tempo"}]);

    c.bench_function("set_data_then_invalidate", |b| {
        b.iter(|| {
            cache.set_data(&key, value.clone());
            cache.invalidate(&key);
        });
    });
}

/// Benchmark cached loads through the resource service.
fn bench_service_load_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let source = StaticDataSource::new();
    source.insert(Resource::Meets, json!([{"id": 10, "name": "Spring Invitational"}]));
    let service = ResourceCache::new(DataCache::new(TTL), Arc::new(source));
    let key = CacheKey::new(Resource::Meets);

    // Warm the cache
    rt.block_on(async {
        let _ = service.load(&key).await;
    });

    c.bench_function("service_load_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = black_box(service.load(&key).await);
        });
    });
}

/// Benchmark write fan-out with different numbers of scoped keys.
fn bench_record_write_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_write_fan_out");

    for size in [10, 100, 1_000].iter() {
        let cache = populated_cache(*size);
        let service = ResourceCache::new(cache.clone(), Arc::new(StaticDataSource::new()));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    cache.set_data(&practices_for(i), json!([]));
                }
                black_box(service.record_write(Resource::TrainingPeriods));
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(50);
    targets = bench_fresh_reads,
        bench_set_and_invalidate,
        bench_service_load_hit,
        bench_record_write_fan_out
}

criterion_main!(benches);
