use crate::cli_args::SizingArgs;

/// Sizing for a scenario.
///
/// Each scenario supplies its own defaults through its `_config` function; the command line can then override any of
/// them for the whole run.
#[derive(Clone, Debug, serde::Serialize, derive_builder::Builder)]
#[builder(pattern = "owned")]
pub struct ScenarioConfig {
    /// Thread counts to sweep, in order.
    #[builder(default = "default_thread_counts()")]
    pub thread_counts: Vec<usize>,

    /// How many times each thread repeats the scenario's basic operation.
    #[builder(default = "10_000")]
    pub iterations: u64,

    /// Units of [crate::busy_work::busy_work] done inside each critical section.
    #[builder(default)]
    pub work: u64,
}

/// Powers of two up to the machine's available parallelism.
pub fn default_thread_counts() -> Vec<usize> {
    let max = std::thread::available_parallelism()
        .map(|x| x.get())
        .unwrap_or(1);

    std::iter::successors(Some(1usize), |x| x.checked_mul(2))
        .take_while(|x| *x <= max)
        .collect()
}

impl ScenarioConfig {
    pub fn with_overrides(mut self, sizing: &SizingArgs) -> ScenarioConfig {
        if !sizing.threads.is_empty() {
            self.thread_counts = sizing.threads.clone();
        }
        if let Some(iterations) = sizing.iterations {
            self.iterations = iterations;
        }
        if let Some(work) = sizing.work {
            self.work = work;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_powers_of_two() {
        let config = ScenarioConfigBuilder::default().build().unwrap();
        assert_eq!(config.thread_counts[0], 1);
        assert!(config.thread_counts.iter().all(|x| x.is_power_of_two()));
        assert_eq!(config.iterations, 10_000);
        assert_eq!(config.work, 0);
    }

    #[test]
    fn overrides_only_replace_what_was_given() {
        let config = ScenarioConfigBuilder::default()
            .thread_counts(vec![1, 2])
            .iterations(50)
            .work(3)
            .build()
            .unwrap();

        let sizing = SizingArgs {
            threads: vec![],
            iterations: Some(7),
            work: None,
        };
        let config = config.with_overrides(&sizing);
        pretty_assertions::assert_eq!(config.thread_counts, vec![1, 2]);
        assert_eq!(config.iterations, 7);
        assert_eq!(config.work, 3);

        let sizing = SizingArgs {
            threads: vec![3, 5],
            ..Default::default()
        };
        pretty_assertions::assert_eq!(config.with_overrides(&sizing).thread_counts, vec![3, 5]);
    }
}
