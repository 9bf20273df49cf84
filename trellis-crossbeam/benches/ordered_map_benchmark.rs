//! Benchmark comparing the map variants against crossbeam-skiplist.
//!
//! Run with: cargo bench --package trellis-crossbeam --bench ordered_map_benchmark

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use crossbeam_skiplist::SkipMap;
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::thread;

use trellis_core::{CoarseSkipMap, OrderedMap};
use trellis_crossbeam::EpochSkipMap;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const OPS_PER_THREAD: usize = 10_000;
const THREAD_COUNTS: [usize; 5] = [1, 2, 4, 8, 16];

// ============================================================================
// Generic workload drivers
// ============================================================================

/// Disjoint-range concurrent inserts.
fn run_insert<M>(map: Arc<M>, thread_count: usize, ops_per_thread: usize)
where
    M: OrderedMap<i64, i64> + Send + Sync + 'static,
{
    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let base = (t * ops_per_thread) as i64;
                for i in 0..ops_per_thread {
                    map.insert(base + i as i64, 0);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

/// 50% insert / 50% remove against a pre-populated map.
fn run_mixed<M>(map: Arc<M>, thread_count: usize, ops_per_thread: usize)
where
    M: OrderedMap<i64, i64> + Send + Sync + 'static,
{
    for i in 0..(thread_count * ops_per_thread / 2) {
        map.insert(i as i64, 0);
    }

    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let base = (t * ops_per_thread) as i64;
                for i in 0..ops_per_thread {
                    if i % 2 == 0 {
                        map.insert(base + i as i64 + 1_000_000, 0);
                    } else {
                        map.remove(&(i as i64 / 2));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Read-heavy sweep over a resident key range.
fn run_lookup<M>(map: Arc<M>, thread_count: usize, ops_per_thread: usize)
where
    M: OrderedMap<i64, i64> + Send + Sync + 'static,
{
    let range = 10_000i64;
    for key in 0..range {
        map.insert(key, key);
    }

    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    black_box(map.contains(&(i as i64 % range)));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

// crossbeam-skiplist has its own API, so it gets hand-rolled drivers.

fn run_crossbeam_insert(thread_count: usize, ops_per_thread: usize) {
    let map: Arc<SkipMap<i64, i64>> = Arc::new(SkipMap::new());
    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let base = (t * ops_per_thread) as i64;
                for i in 0..ops_per_thread {
                    map.insert(base + i as i64, 0);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn run_crossbeam_mixed(thread_count: usize, ops_per_thread: usize) {
    let map: Arc<SkipMap<i64, i64>> = Arc::new(SkipMap::new());
    for i in 0..(thread_count * ops_per_thread / 2) {
        map.insert(i as i64, 0);
    }

    let handles: Vec<_> = (0..thread_count)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let base = (t * ops_per_thread) as i64;
                for i in 0..ops_per_thread {
                    if i % 2 == 0 {
                        map.insert(base + i as i64 + 1_000_000, 0);
                    } else {
                        map.remove(&(i as i64 / 2));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Criterion benchmark groups
// ============================================================================

fn insert_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_benchmark_ordered_map");

    for threads in THREAD_COUNTS {
        group.bench_with_input(
            BenchmarkId::new("insert_lazy_epoch", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let map: Arc<EpochSkipMap<i64, i64>> = Arc::new(EpochSkipMap::default());
                    run_insert(map, black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("insert_coarse", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let map: Arc<CoarseSkipMap<i64, i64>> = Arc::new(CoarseSkipMap::default());
                    run_insert(map, black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("insert_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| run_crossbeam_insert(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

fn mixed_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_benchmark_ordered_map");

    for threads in THREAD_COUNTS {
        group.bench_with_input(
            BenchmarkId::new("mixed_lazy_epoch", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let map: Arc<EpochSkipMap<i64, i64>> = Arc::new(EpochSkipMap::default());
                    run_mixed(map, black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("mixed_coarse", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let map: Arc<CoarseSkipMap<i64, i64>> = Arc::new(CoarseSkipMap::default());
                    run_mixed(map, black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("mixed_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| run_crossbeam_mixed(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

fn lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_benchmark_ordered_map");

    for threads in THREAD_COUNTS {
        group.bench_with_input(
            BenchmarkId::new("lookup_lazy_epoch", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let map: Arc<EpochSkipMap<i64, i64>> = Arc::new(EpochSkipMap::default());
                    run_lookup(map, black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("lookup_coarse", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let map: Arc<CoarseSkipMap<i64, i64>> = Arc::new(CoarseSkipMap::default());
                    run_lookup(map, black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    insert_benchmark,
    mixed_benchmark,
    lookup_benchmark
);
criterion_main!(benches);
