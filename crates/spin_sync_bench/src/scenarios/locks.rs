//! Mutual exclusion and scaling of every lock, with `std::sync::Mutex` as a baseline.
use std::cell::UnsafeCell;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;

use spin_sync::{Lock, McsLock, QueueNode, TasLock, TtasLock};

use crate::busy_work::busy_work;
use crate::context::ScenarioContext;
use crate::scenario_config::{ScenarioConfig, ScenarioConfigBuilder};

#[derive(Copy, Clone, Debug, derive_more::Display)]
enum LockKind {
    #[display(fmt = "tas")]
    Tas,

    #[display(fmt = "tas+backoff")]
    TasBackoff,

    #[display(fmt = "ttas")]
    Ttas,

    #[display(fmt = "ttas+backoff")]
    TtasBackoff,

    #[display(fmt = "mcs")]
    Mcs,

    #[display(fmt = "std mutex")]
    StdMutex,
}

const ALL_KINDS: [LockKind; 6] = [
    LockKind::Tas,
    LockKind::TasBackoff,
    LockKind::Ttas,
    LockKind::TtasBackoff,
    LockKind::Mcs,
    LockKind::StdMutex,
];

/// A counter whose only protection is whatever lock the scenario wraps around it.
#[derive(Default)]
struct Unprotected(UnsafeCell<u64>);

unsafe impl Sync for Unprotected {}

impl Unprotected {
    /// # Safety
    ///
    /// Must be called with the lock held.
    unsafe fn bump(&self) {
        // Separate read and write so that a broken lock actually loses updates.
        let v = unsafe { std::ptr::read_volatile(self.0.get()) };
        unsafe { std::ptr::write_volatile(self.0.get(), v + 1) };
    }
}

/// Every thread enters the critical section `iterations` times, doing `work` units of busy work and one increment
/// each time.  Returns the elapsed time and the final count.
fn contend<L: Lock>(ctx: &ScenarioContext, lock: &L, threads: usize) -> Result<(Duration, u64)> {
    let counter = Unprotected::default();
    let iterations = ctx.config.iterations;
    let work = ctx.config.work;

    let elapsed = ctx.run_workers(threads, |_| {
        let mut node = L::Node::default();
        for _ in 0..iterations {
            lock.with_lock(&mut node, || {
                busy_work(work);
                unsafe { counter.bump() };
            });
        }
    })?;

    Ok((elapsed, counter.0.into_inner()))
}

fn contend_std(ctx: &ScenarioContext, threads: usize) -> Result<(Duration, u64)> {
    let counter = Mutex::new(0u64);
    let iterations = ctx.config.iterations;
    let work = ctx.config.work;

    let elapsed = ctx.run_workers(threads, |_| {
        for _ in 0..iterations {
            let mut guard = counter.lock().unwrap();
            busy_work(work);
            *guard += 1;
        }
    })?;

    let total = counter
        .into_inner()
        .map_err(|_| anyhow::anyhow!("The baseline mutex was poisoned"))?;
    Ok((elapsed, total))
}

fn run_kind(ctx: &ScenarioContext, kind: LockKind, threads: usize) -> Result<(Duration, u64)> {
    match kind {
        LockKind::Tas => contend(ctx, &TasLock::new(), threads),
        LockKind::TasBackoff => contend(ctx, &TasLock::with_backoff(), threads),
        LockKind::Ttas => contend(ctx, &TtasLock::new(), threads),
        LockKind::TtasBackoff => contend(ctx, &TtasLock::with_backoff(), threads),
        LockKind::Mcs => contend(ctx, &McsLock::new(), threads),
        LockKind::StdMutex => contend_std(ctx, threads),
    }
}

/// Run every lock at every configured thread count, checking that no increment was lost.
fn sweep(ctx: &mut ScenarioContext) -> Result<()> {
    let iterations = ctx.config.iterations;

    for threads in ctx.config.thread_counts.clone() {
        for kind in ALL_KINDS {
            let (elapsed, total) = run_kind(ctx, kind, threads)?;
            let expected = threads as u64 * iterations;
            ctx.check_eq(format!("{kind} with {threads} threads"), expected, total);
            ctx.record(kind, threads, expected, elapsed);
        }
    }

    Ok(())
}

fn mutual_exclusion_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default()
        .thread_counts(vec![1, 2, 4, 8, 16])
        .iterations(10_000)
        .build()
        .unwrap()
}

fn mutual_exclusion(ctx: &mut ScenarioContext) -> Result<()> {
    sweep(ctx)
}

register_scenario!(mutual_exclusion);

fn scalability_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default()
        .iterations(20_000)
        .work(10)
        .build()
        .unwrap()
}

/// As [mutual_exclusion], but up to the machine's core count and with real work in the critical section, which is
/// where the locks start to separate.
fn scalability(ctx: &mut ScenarioContext) -> Result<()> {
    sweep(ctx)
}

register_scenario!(scalability);

fn mcs_fifo_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default()
        .thread_counts(vec![2, 8, 32])
        .iterations(1)
        .build()
        .unwrap()
}

/// Queue waiters behind a held MCS lock strictly one after another, then check they are admitted in that order.
///
/// Each waiter is only started once the previous one has linked itself into the queue, so the queue order is known.
fn mcs_fifo(ctx: &mut ScenarioContext) -> Result<()> {
    for waiters in ctx.config.thread_counts.clone() {
        for round in 0..ctx.config.iterations {
            let lock = McsLock::new();
            let nodes = (0..=waiters).map(|_| QueueNode::new()).collect::<Vec<_>>();
            let order = Mutex::new(vec![]);

            std::thread::scope(|s| {
                // Every node outlives the scope, and each is used by exactly one thread.
                unsafe { lock.acquire(&nodes[0]) };

                for i in 1..=waiters {
                    let lock = &lock;
                    let order = &order;
                    let node = &nodes[i];
                    s.spawn(move || {
                        unsafe { lock.acquire(node) };
                        order.lock().unwrap().push(i);
                        unsafe { lock.release(node) };
                    });

                    while !nodes[i - 1].has_successor() {
                        std::thread::yield_now();
                    }
                }

                unsafe { lock.release(&nodes[0]) };
            });

            let order = order
                .into_inner()
                .map_err(|_| anyhow::anyhow!("A waiter panicked while recording its turn"))?;
            ctx.check_eq(
                format!("admission order with {waiters} waiters, round {round}"),
                (1..=waiters).collect::<Vec<_>>(),
                order,
            );
            ctx.check_eq(
                format!("lock free after {waiters} waiters, round {round}"),
                false,
                lock.is_locked(),
            );
        }
    }

    Ok(())
}

register_scenario!(mcs_fifo);
