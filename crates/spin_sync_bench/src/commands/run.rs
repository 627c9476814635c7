use crate::cli_args::{CliArgs, RunArgs};

pub fn run(_top_args: &CliArgs, run_args: &RunArgs) {
    crate::scenario_runner::run_scenarios(run_args);
}
