//! The three counter strategies raced against each other.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;

use spin_sync::{CasCounter, Counter, FetchAddCounter, LockedCounter, McsLock, TasLock, TtasLock};

use crate::context::ScenarioContext;
use crate::scenario_config::{ScenarioConfig, ScenarioConfigBuilder};

fn all_counters() -> Vec<(&'static str, Box<dyn Counter>)> {
    vec![
        ("locked/tas", Box::new(LockedCounter::<TasLock>::new()) as Box<dyn Counter>),
        ("locked/ttas", Box::new(LockedCounter::<TtasLock>::new()) as Box<dyn Counter>),
        ("locked/mcs", Box::new(LockedCounter::<McsLock>::new()) as Box<dyn Counter>),
        ("cas", Box::new(CasCounter::new()) as Box<dyn Counter>),
        ("fetch_add", Box::new(FetchAddCounter::new()) as Box<dyn Counter>),
    ]
}

fn race(ctx: &ScenarioContext, counter: &dyn Counter, threads: usize) -> Result<Duration> {
    let iterations = ctx.config.iterations;
    ctx.run_workers(threads, |_| {
        for _ in 0..iterations {
            counter.increment();
        }
    })
}

fn equivalence_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default()
        .thread_counts(vec![1, 2, 4])
        .iterations(100_000)
        .build()
        .unwrap()
}

/// Every strategy must end at exactly `threads * iterations`.
fn equivalence(ctx: &mut ScenarioContext) -> Result<()> {
    let iterations = ctx.config.iterations;

    for threads in ctx.config.thread_counts.clone() {
        for (name, counter) in all_counters() {
            let elapsed = race(ctx, &*counter, threads)?;
            let expected = threads as u64 * iterations;
            ctx.check_eq(format!("{name} with {threads} threads"), expected, counter.get());
            ctx.record(name, threads, expected, elapsed);
        }
    }

    Ok(())
}

register_scenario!(equivalence);

fn bounded_cas_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default()
        .thread_counts(vec![2, 4, 8])
        .iterations(10_000)
        .build()
        .unwrap()
}

/// Attempts allowed for each bounded increment.
const CAS_ATTEMPTS: u32 = 2;

/// With a small retry budget some increments give up under contention; the counter must reflect exactly the ones that
/// reported success.
fn bounded_cas(ctx: &mut ScenarioContext) -> Result<()> {
    let iterations = ctx.config.iterations;

    for threads in ctx.config.thread_counts.clone() {
        let counter = CasCounter::new();
        let succeeded = AtomicU64::new(0);
        let abandoned = AtomicU64::new(0);

        let elapsed = ctx.run_workers(threads, |_| {
            for _ in 0..iterations {
                match counter.try_increment(CAS_ATTEMPTS) {
                    Ok(_) => succeeded.fetch_add(1, Ordering::Relaxed),
                    Err(e) if e.is_contention() => abandoned.fetch_add(1, Ordering::Relaxed),
                    Err(e) => panic!("Unexpected error from a bounded increment: {e}"),
                };
            }
        })?;

        let succeeded = succeeded.into_inner();
        let abandoned = abandoned.into_inner();
        log::info!("bounded CAS with {threads} threads: {succeeded} succeeded, {abandoned} abandoned");

        let label = format!("bounded cas with {threads} threads");
        ctx.check_eq(format!("{label}: value"), succeeded, counter.get());
        ctx.check_eq(
            format!("{label}: attempts accounted for"),
            threads as u64 * iterations,
            succeeded + abandoned,
        );
        ctx.record("cas/bounded", threads, succeeded, elapsed);
    }

    Ok(())
}

register_scenario!(bounded_cas);
