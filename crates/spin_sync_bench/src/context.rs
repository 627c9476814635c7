use std::fmt::{Debug, Display};
use std::time::{Duration, Instant};

use anyhow::Result;

use spin_sync::{SenseBarrier, SpinPolicy};

use crate::outcome::{Measurement, ValidationFailure};
use crate::scenario_config::ScenarioConfig;

/// Handed to every scenario.  Runs worker threads and collects what the scenario found.
pub struct ScenarioContext {
    pub scenario_name: String,
    pub config: ScenarioConfig,
    measurements: Vec<Measurement>,
    failures: Vec<ValidationFailure>,
}

impl ScenarioContext {
    pub fn from_config(scenario_name: &str, config: ScenarioConfig) -> ScenarioContext {
        ScenarioContext {
            scenario_name: scenario_name.to_string(),
            config,
            measurements: vec![],
            failures: vec![],
        }
    }

    /// Run `worker(index)` on `threads` fresh threads and return how long they took.
    ///
    /// The threads are held at a start gate until all of them exist, so that thread creation is not timed and the
    /// early ones don't get a head start.  The clock starts when the gate opens and stops when the last worker is
    /// joined.
    pub fn run_workers<F>(&self, threads: usize, worker: F) -> Result<Duration>
    where
        F: Fn(usize) + Sync,
    {
        // The gate is a single phase, so yielding is plenty.
        let gate = SenseBarrier::with_policy(threads + 1, SpinPolicy::Yield)?;

        let started = std::thread::scope(|s| {
            for index in 0..threads {
                let gate = &gate;
                let worker = &worker;
                s.spawn(move || {
                    gate.wait();
                    worker(index);
                });
            }

            gate.wait();
            Instant::now()
        });

        Ok(started.elapsed())
    }

    pub fn record(&mut self, variant: impl Display, threads: usize, operations: u64, elapsed: Duration) {
        let m = Measurement {
            variant: variant.to_string(),
            threads,
            operations,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        };
        log::info!(
            "{}: {} with {threads} threads took {:.3}ms ({:.1}ns/op)",
            self.scenario_name,
            m.variant,
            m.elapsed_ms,
            m.nanos_per_operation()
        );
        self.measurements.push(m);
    }

    /// Record a failure unless `expected == actual`.  Returns whether the check passed.
    ///
    /// Failures do not stop the scenario, so one run can report every variant that went wrong.
    pub fn check_eq<T: PartialEq + Debug>(&mut self, check: impl Display, expected: T, actual: T) -> bool {
        if expected == actual {
            return true;
        }

        let failure = ValidationFailure {
            check: check.to_string(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        };
        log::error!(
            "{}: {} expected {} but got {}",
            self.scenario_name,
            failure.check,
            failure.expected,
            failure.actual
        );
        self.failures.push(failure);
        false
    }

    pub fn into_parts(self) -> (Vec<Measurement>, Vec<ValidationFailure>) {
        (self.measurements, self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::scenario_config::ScenarioConfigBuilder;

    fn context() -> ScenarioContext {
        ScenarioContext::from_config("self_test", ScenarioConfigBuilder::default().build().unwrap())
    }

    #[test]
    fn workers_all_run_once() {
        let ctx = context();
        let ran = AtomicUsize::new(0);
        let indices = AtomicUsize::new(0);

        ctx.run_workers(5, |i| {
            ran.fetch_add(1, Ordering::Relaxed);
            indices.fetch_add(1 << i, Ordering::Relaxed);
        })
        .unwrap();

        assert_eq!(ran.into_inner(), 5);
        assert_eq!(indices.into_inner(), 0b11111);
    }

    #[test]
    fn zero_workers_is_fine() {
        context().run_workers(0, |_| unreachable!()).unwrap();
    }

    #[test]
    fn checks_collect_failures() {
        let mut ctx = context();
        assert!(ctx.check_eq("same", 1, 1));
        assert!(!ctx.check_eq("different", 1, 2));
        ctx.record("variant", 2, 10, Duration::from_millis(3));

        let (measurements, failures) = ctx.into_parts();
        assert_eq!(measurements.len(), 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].check, "different");
        assert_eq!(failures[0].expected, "1");
        assert_eq!(failures[0].actual, "2");
    }
}
