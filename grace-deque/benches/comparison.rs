//! Comparison: RCU deque vs the shared-lock baseline.
//!
//! The workload is read-mostly: each thread runs a batch of searches for one
//! value, and every thousandth operation replaces the layout instead (copy
//! the island array, shuffle it, publish). The RCU variant retires the old
//! array; the baseline shuffles in place under its exclusive lock.

use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use grace_deque::{Deque, RwDeque, ISLAND_SIZE};

// Whole islands so shuffles never surface tail padding.
const LEN: usize = 40 * ISLAND_SIZE;
const NEEDLE: usize = 5_000;
const OPS_PER_THREAD: usize = 1_000;

fn run_rcu(threads: usize) {
    let domain = grace::default_domain();
    let deque = Deque::from_range(0..LEN);

    thread::scope(|scope| {
        for tid in 0..threads {
            let deque = &deque;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(tid as u64);
                for i in 0..OPS_PER_THREAD {
                    if i % 1_000 == 0 {
                        let writer = deque.write_lock();
                        let mut islands: Vec<_> = writer.islands().to_vec();
                        islands.shuffle(&mut rng);
                        writer.publish(islands.into_boxed_slice(), writer.len());
                    } else {
                        let guard = domain.pin();
                        let view = deque.view(&guard);
                        black_box(view.iter().any(|&x| x == NEEDLE));
                    }
                }
            });
        }
    });

    grace::synchronize();
}

fn run_shared_lock(threads: usize) {
    let deque = RwDeque::from_range(0..LEN);

    thread::scope(|scope| {
        for tid in 0..threads {
            let deque = &deque;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(tid as u64);
                for i in 0..OPS_PER_THREAD {
                    if i % 1_000 == 0 {
                        let mut writer = deque.write();
                        writer.islands_mut().shuffle(&mut rng);
                    } else {
                        let view = deque.read();
                        black_box(view.iter().any(|&x| x == NEEDLE));
                    }
                }
            });
        }
    });
}

fn bench_find_with_republish(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_with_republish");

    for threads in [1usize, 2, 4] {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));
        group.bench_with_input(BenchmarkId::new("rcu", threads), &threads, |b, &threads| {
            b.iter(|| run_rcu(threads));
        });
        group.bench_with_input(
            BenchmarkId::new("shared_lock", threads),
            &threads,
            |b, &threads| {
                b.iter(|| run_shared_lock(threads));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_find_with_republish);
criterion_main!(benches);
