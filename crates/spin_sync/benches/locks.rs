use std::cell::UnsafeCell;
use std::sync::Barrier;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use spin_sync::{Lock, McsLock, TasLock, TtasLock};

const THREAD_COUNTS: &[usize] = &[1, 2, 4, 8];
const ITERATIONS_PER_THREAD: u64 = 10_000;

/// The data "protected" by the lock under test.
#[derive(Default)]
struct Shared(UnsafeCell<u64>);

unsafe impl Sync for Shared {}

impl Shared {
    /// # Safety
    ///
    /// Only call with the lock held.
    unsafe fn bump(&self) {
        unsafe { *self.0.get() += 1 };
    }
}

/// Run `threads` workers which each take `lock` `ITERATIONS_PER_THREAD` times around a tiny critical section.
fn contend<L: Lock>(lock: &L, threads: usize) {
    let start = Barrier::new(threads);
    let shared = Shared::default();

    std::thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let mut node = L::Node::default();
                start.wait();
                for _ in 0..ITERATIONS_PER_THREAD {
                    lock.with_lock(&mut node, || unsafe { shared.bump() });
                }
            });
        }
    });

    black_box(shared.0.into_inner());
}

fn bench_lock<L: Lock>(c: &mut Criterion, name: &str, make: fn() -> L) {
    let mut group = c.benchmark_group(name);

    for threads in THREAD_COUNTS.iter().copied() {
        group.throughput(Throughput::Elements(threads as u64 * ITERATIONS_PER_THREAD));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, threads| {
            let lock = make();
            b.iter(|| contend(&lock, *threads));
        });
    }
}

pub fn tas(c: &mut Criterion) {
    bench_lock(c, "TasLock", TasLock::new);
    bench_lock(c, "TasLock+backoff", TasLock::with_backoff);
}

pub fn ttas(c: &mut Criterion) {
    bench_lock(c, "TtasLock", TtasLock::new);
    bench_lock(c, "TtasLock+backoff", TtasLock::with_backoff);
}

pub fn mcs(c: &mut Criterion) {
    bench_lock(c, "McsLock", McsLock::new);
}

criterion_group!(benches, tas, ttas, mcs);
criterion_main!(benches);
