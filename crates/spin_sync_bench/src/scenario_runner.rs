//! Runs scenarios one at a time in this process.
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli_args::{RunArgs, SizingArgs};
use crate::context::ScenarioContext;
use crate::outcome::{ScenarioOutcome, ScenarioReport};
use crate::registry::ScenarioRegistryEntry;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<panic payload is not a string>".to_string()
    }
}

/// Run one scenario start to finish.  Never fails: errors and panics become the outcome.
pub fn run_single_scenario(entry: &ScenarioRegistryEntry, sizing: &SizingArgs) -> ScenarioReport {
    let name = entry.name();
    let config = (entry.config_fn)().with_overrides(sizing);
    log::info!("Running {name} with {config:?}");

    let mut context = ScenarioContext::from_config(name, config.clone());
    let res = std::panic::catch_unwind(AssertUnwindSafe(|| (entry.run_fn)(&mut context)));
    let (measurements, failures) = context.into_parts();

    let outcome = match res {
        Err(payload) => ScenarioOutcome::Panicked {
            message: panic_message(&*payload),
        },
        // Alternate formatting keeps the context chain.
        Ok(Err(e)) => ScenarioOutcome::RunnerFailed {
            reason: format!("{e:#}"),
        },
        Ok(Ok(())) if !failures.is_empty() => ScenarioOutcome::ValidationFailed { failures },
        Ok(Ok(())) => ScenarioOutcome::Passed,
    };

    ScenarioReport {
        name: name.to_string(),
        config,
        outcome,
        measurements,
    }
}

fn write_json(path: &Path, reports: &[ScenarioReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    std::fs::write(path, json)
        .with_context(|| format!("While writing results to {}", path.display()))
}

/// Filter down the scenarios with the provided arguments and run them all, reporting each to stderr as it finishes.
///
/// This function never returns, and exits the process with the appropriate error code.
pub fn run_scenarios(args: &RunArgs) {
    let mut all_passed = true;
    let mut reports = vec![];

    for entry in crate::scenario_filtering::get_scenarios_filtered(&args.filter) {
        let report = run_single_scenario(entry, &args.sizing);
        all_passed &= report.outcome.is_passed();
        eprintln!("{}", crate::reporter::report_scenario(&report));
        reports.push(report);
    }

    if reports.is_empty() {
        eprintln!("No scenarios matched");
    }

    if let Some(path) = args.json.as_deref() {
        if let Err(e) = write_json(path, &reports) {
            eprintln!("{e:?}");
            all_passed = false;
        }
    }

    let exit_code = (!all_passed) as _;
    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::scenario_config::{ScenarioConfig, ScenarioConfigBuilder};

    fn small_config() -> ScenarioConfig {
        ScenarioConfigBuilder::default()
            .thread_counts(vec![1, 2])
            .iterations(10)
            .build()
            .unwrap()
    }

    fn passes(ctx: &mut ScenarioContext) -> Result<()> {
        ctx.check_eq("arithmetic", 4, 2 + 2);
        Ok(())
    }

    fn fails_validation(ctx: &mut ScenarioContext) -> Result<()> {
        ctx.check_eq("arithmetic", 5, 2 + 2);
        Ok(())
    }

    fn errors(_ctx: &mut ScenarioContext) -> Result<()> {
        anyhow::bail!("could not start")
    }

    fn panics(_ctx: &mut ScenarioContext) -> Result<()> {
        panic!("boom")
    }

    fn entry(run_fn: fn(&mut ScenarioContext) -> Result<()>) -> ScenarioRegistryEntry {
        ScenarioRegistryEntry {
            config_fn: small_config,
            run_fn,
            unsanitized_name: "spin_sync_bench::scenarios::self_test::entry",
            name: Box::leak(Box::new(once_cell::race::OnceBox::new())),
            file: file!(),
            line: line!(),
            column: column!(),
        }
    }

    #[test]
    fn outcomes_are_classified() {
        let sizing = SizingArgs::default();

        let report = run_single_scenario(&entry(passes), &sizing);
        assert_eq!(report.name, "self_test.entry");
        assert!(report.outcome.is_passed());

        let report = run_single_scenario(&entry(fails_validation), &sizing);
        match report.outcome {
            ScenarioOutcome::ValidationFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].expected, "5");
                assert_eq!(failures[0].actual, "4");
            }
            o => panic!("Unexpected outcome {o:?}"),
        }

        let report = run_single_scenario(&entry(errors), &sizing);
        assert!(report.outcome.is_runner_failed());

        let report = run_single_scenario(&entry(panics), &sizing);
        match report.outcome {
            ScenarioOutcome::Panicked { message } => assert_eq!(message, "boom"),
            o => panic!("Unexpected outcome {o:?}"),
        }
    }

    #[test]
    fn overrides_reach_the_report() {
        let sizing = SizingArgs {
            iterations: Some(3),
            ..Default::default()
        };
        let report = run_single_scenario(&entry(passes), &sizing);
        assert_eq!(report.config.iterations, 3);
        assert_eq!(report.config.thread_counts, vec![1, 2]);
    }
}
