use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;
use table_translator::egress::{EgressPool, ManualClock, PoolConfig};
use table_translator::{CacheEntry, CacheStore, EgressIdentity, Outcome};

fn identities(proxies: usize) -> Vec<EgressIdentity> {
    let mut ids = vec![EgressIdentity::direct()];
    for i in 1..=proxies {
        ids.push(EgressIdentity::proxy(i, format!("10.0.{}.{}:8080", i / 256, i % 256)));
    }
    ids
}

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");

    for proxies in [0usize, 10, 100, 1000] {
        let clock = Arc::new(ManualClock::new(0));
        let config = PoolConfig::from_rate_limit(60).unwrap();
        let pool = EgressPool::with_clock(identities(proxies), config, clock.clone()).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(proxies + 1),
            &pool,
            |b, pool| {
                b.iter(|| {
                    // Step past the guard so every scan finds an identity
                    clock.advance_secs(2);
                    let id = pool.try_acquire().unwrap();
                    pool.release(black_box(&id), Outcome::Success);
                })
            },
        );
    }

    group.finish();
}

fn bench_exhausted_scan(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(0));
    let config = PoolConfig::from_rate_limit(1).unwrap();
    let pool = EgressPool::with_clock(identities(1000), config, clock).unwrap();

    while let Some(id) = pool.try_acquire() {
        pool.release(&id, Outcome::Success);
    }

    c.bench_function("exhausted_scan_1001", |b| {
        b.iter(|| black_box(pool.try_acquire()))
    });
}

fn bench_cache_lookup(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CacheStore::open(dir.path().join("bench.db")).unwrap();

    for i in 0..1000 {
        store
            .insert(&CacheEntry {
                word: format!("palabra{}", i),
                input_lang: Some("es".to_string()),
                output_lang: "en".to_string(),
                translation: format!("word{}", i),
                metadata: json!({"translation": format!("word{}", i)}),
            })
            .unwrap();
    }

    c.bench_function("cache_lookup_hit", |b| {
        b.iter(|| store.lookup(black_box("palabra500"), "en").unwrap())
    });

    c.bench_function("cache_lookup_miss", |b| {
        b.iter(|| store.lookup(black_box("inexistente"), "en").unwrap())
    });
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_exhausted_scan,
    bench_cache_lookup
);
criterion_main!(benches);
