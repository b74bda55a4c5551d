//! Guard acquisition benchmarks.
//!
//! Measures the cost of acquiring and releasing guards:
//! - Uncontended exclusive and shared acquisition under both policies
//! - Raw `parking_lot::RwLock` as the baseline the guards wrap
//! - Shared acquisition while other threads hold shared guards
//!
//! Run: `cargo bench --bench guard_acquire`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use guarded_resource::{GuardedResource, LockPolicy};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn policies() -> [(&'static str, LockPolicy); 2] {
    [
        ("blocking", LockPolicy::Blocking),
        ("bounded", LockPolicy::bounded()),
    ]
}

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");

    for (name, policy) in policies() {
        let resource = GuardedResource::with_policy(0_u64, policy);

        group.bench_function(BenchmarkId::new("exclusive", name), |b| {
            b.iter(|| {
                let mut guard = resource.exclusive_lock().expect("uncontended");
                *guard = black_box(*guard + 1);
            });
        });

        group.bench_function(BenchmarkId::new("shared", name), |b| {
            b.iter(|| {
                let guard = resource.shared_lock().expect("uncontended");
                black_box(*guard);
            });
        });
    }

    let raw = parking_lot::RwLock::new(0_u64);
    group.bench_function("raw_parking_lot/write", |b| {
        b.iter(|| {
            let mut guard = raw.write();
            *guard = black_box(*guard + 1);
        });
    });
    group.bench_function("raw_parking_lot/read", |b| {
        b.iter(|| {
            let guard = raw.read();
            black_box(*guard);
        });
    });

    group.finish();
}

fn bench_shared_with_background_readers(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_with_readers");

    for readers in [1_usize, 4] {
        let resource = Arc::new(GuardedResource::bounded(vec![0_u8; 64]));
        let stop = Arc::new(AtomicBool::new(false));
        let started = Arc::new(Barrier::new(readers + 1));

        let handles: Vec<_> = (0..readers)
            .map(|_| {
                let resource = Arc::clone(&resource);
                let stop = Arc::clone(&stop);
                let started = Arc::clone(&started);
                thread::spawn(move || {
                    started.wait();
                    while !stop.load(Ordering::Relaxed) {
                        let guard = resource.shared_lock().expect("readers never block readers");
                        black_box(guard.len());
                    }
                })
            })
            .collect();
        started.wait();

        group.bench_with_input(BenchmarkId::from_parameter(readers), &resource, |b, resource| {
            b.iter(|| {
                let guard = resource.shared_lock().expect("readers never block readers");
                black_box(guard[0]);
            });
        });

        stop.store(true, Ordering::Relaxed);
        for handle in handles {
            let _ = handle.join();
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended,
    bench_shared_with_background_readers
);
criterion_main!(benches);
