//! Sense-reversing barrier correctness over many phases, and its phase cost against `std::sync::Barrier`.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;

use spin_sync::{SenseBarrier, SpinPolicy};

use crate::context::ScenarioContext;
use crate::scenario_config::{ScenarioConfig, ScenarioConfigBuilder};

#[derive(Copy, Clone, Debug, derive_more::Display)]
enum BarrierKind {
    #[display(fmt = "sense+backoff")]
    SenseBackoff,

    #[display(fmt = "sense+yield")]
    SenseYield,

    #[display(fmt = "std barrier")]
    Std,
}

const ALL_KINDS: [BarrierKind; 3] = [
    BarrierKind::SenseBackoff,
    BarrierKind::SenseYield,
    BarrierKind::Std,
];

fn build_sense_barrier(kind: BarrierKind, threads: usize) -> Result<SenseBarrier> {
    let barrier = match kind {
        BarrierKind::SenseYield => SenseBarrier::with_policy(threads, SpinPolicy::Yield)?,
        _ => SenseBarrier::new(threads)?,
    };
    Ok(barrier)
}

fn rendezvous_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default()
        .thread_counts(vec![1, 2, 3, 4, 8])
        .iterations(1000)
        .build()
        .unwrap()
}

/// Every participant counts its arrival before each wait, then checks after the wait that the whole phase arrived and
/// that nobody has yet arrived twice for the next one.  Any departure before the phase completed shows up as a count
/// out of that window.
fn rendezvous(ctx: &mut ScenarioContext) -> Result<()> {
    let rounds = ctx.config.iterations as usize;

    for threads in ctx.config.thread_counts.clone() {
        for kind in [BarrierKind::SenseBackoff, BarrierKind::SenseYield] {
            let barrier = build_sense_barrier(kind, threads)?;
            let arrived = AtomicUsize::new(0);
            let early_departures = AtomicUsize::new(0);
            let leaders = AtomicUsize::new(0);

            let elapsed = ctx.run_workers(threads, |_| {
                // No phase can complete before this participant first arrives.
                let mut local = barrier.participant();

                for round in 0..rounds {
                    arrived.fetch_add(1, Ordering::Relaxed);
                    if barrier.wait_with(&mut local).is_leader() {
                        leaders.fetch_add(1, Ordering::Relaxed);
                    }

                    let seen = arrived.load(Ordering::Relaxed);
                    if !(threads * (round + 1)..threads * (round + 2)).contains(&seen) {
                        log::error!("Round {round}: saw {seen} arrivals with {threads} participants");
                        early_departures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })?;

            let label = format!("{kind} with {threads} threads");
            ctx.check_eq(format!("{label}: arrivals"), threads * rounds, arrived.into_inner());
            ctx.check_eq(format!("{label}: leaders"), rounds, leaders.into_inner());
            ctx.check_eq(format!("{label}: early departures"), 0, early_departures.into_inner());
            ctx.record(kind, threads, rounds as u64, elapsed);
        }
    }

    Ok(())
}

register_scenario!(rendezvous);

fn phase_timing_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default().iterations(10_000).build().unwrap()
}

fn time_phases(ctx: &ScenarioContext, kind: BarrierKind, threads: usize) -> Result<(Duration, usize)> {
    let phases = ctx.config.iterations;
    let leaders = AtomicUsize::new(0);

    let elapsed = match kind {
        BarrierKind::Std => {
            let barrier = std::sync::Barrier::new(threads);
            ctx.run_workers(threads, |_| {
                for _ in 0..phases {
                    if barrier.wait().is_leader() {
                        leaders.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })?
        }
        _ => {
            let barrier = build_sense_barrier(kind, threads)?;
            ctx.run_workers(threads, |_| {
                for _ in 0..phases {
                    if barrier.wait().is_leader() {
                        leaders.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })?
        }
    };

    Ok((elapsed, leaders.into_inner()))
}

/// How long a phase takes with nothing happening between waits.
fn phase_timing(ctx: &mut ScenarioContext) -> Result<()> {
    let phases = ctx.config.iterations;

    for threads in ctx.config.thread_counts.clone() {
        for kind in ALL_KINDS {
            let (elapsed, leaders) = time_phases(ctx, kind, threads)?;
            ctx.check_eq(
                format!("{kind} with {threads} threads: leaders"),
                phases as usize,
                leaders,
            );
            ctx.record(kind, threads, phases, elapsed);
        }
    }

    Ok(())
}

register_scenario!(phase_timing);

fn zero_participants_config() -> ScenarioConfig {
    ScenarioConfigBuilder::default()
        .thread_counts(vec![0])
        .iterations(1)
        .build()
        .unwrap()
}

/// Building a barrier for nobody is a configuration error, not a hang.
fn zero_participants(ctx: &mut ScenarioContext) -> Result<()> {
    let rejected = match SenseBarrier::new(0) {
        Ok(_) => false,
        Err(e) => {
            log::debug!("Rejected as expected: {e}");
            e.is_config()
        }
    };
    ctx.check_eq("zero participants rejected", true, rejected);
    Ok(())
}

register_scenario!(zero_participants);
