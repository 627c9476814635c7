//! What running a scenario produced.  Serialized as-is for `--json`.
use serde::Serialize;

use crate::scenario_config::ScenarioConfig;

#[derive(Clone, Debug, Serialize, derive_more::IsVariant)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,

    /// The scenario ran to completion but at least one check did not hold.
    ValidationFailed { failures: Vec<ValidationFailure> },

    /// The scenario returned an error, for example because a primitive rejected its configuration.
    RunnerFailed { reason: String },

    Panicked { message: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationFailure {
    pub check: String,
    pub expected: String,
    pub actual: String,
}

/// One timed run of one variant at one thread count.
#[derive(Clone, Debug, Serialize)]
pub struct Measurement {
    pub variant: String,
    pub threads: usize,

    /// Total operations across all threads.
    pub operations: u64,
    pub elapsed_ms: f64,
}

impl Measurement {
    pub fn nanos_per_operation(&self) -> f64 {
        if self.operations == 0 {
            return 0.0;
        }
        self.elapsed_ms * 1_000_000.0 / self.operations as f64
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub config: ScenarioConfig,
    pub outcome: ScenarioOutcome,
    pub measurements: Vec<Measurement>,
}
