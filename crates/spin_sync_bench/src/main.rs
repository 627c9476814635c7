//! Correctness and timing scenarios for `spin_sync`.
//!
//! The unit tests in `spin_sync` check each primitive in isolation with small thread counts.  This binary instead runs
//! whole scenarios: many threads hammering a lock with a configurable amount of work in the critical section, barriers
//! cycled for thousands of phases, counters raced against each other.  Every scenario validates its results (a lost
//! increment or an early barrier departure is a failure) and records how long each variant took, so one run answers
//! both "is it right" and "how does it scale".
//!
//! A scenario is a function `fn x(&mut ScenarioContext) -> anyhow::Result<()>` plus a `fn x_config() ->
//! ScenarioConfig`, registered with [register_scenario].  Names default to `module.path.function` with the
//! `spin_sync_bench.scenarios.` prefix removed, e.g. `locks.mutual_exclusion`, and can be selected with a glob:
//!
//! ```text
//! cargo run --release --bin spin_sync_bench -- run 'locks.*' --threads 1,2,4,8
//! ```
//!
//! Scenarios run one after another in this process, since timings taken while another scenario is running would be
//! meaningless.  A panicking scenario is caught and reported as a failure; the process exits non-zero if anything
//! failed.  Set `RUST_LOG` for progress output.
#[macro_use]
mod registration_macro;

mod busy_work;
mod cli_args;
mod commands;
mod context;
mod outcome;
mod registry;
mod reporter;
mod scenario_config;
mod scenario_filtering;
mod scenario_runner;
mod scenarios;

fn main() {
    use clap::Parser;

    env_logger::init();

    let args = cli_args::CliArgs::parse();
    commands::dispatch_command(args);
}
