//! All registered scenarios, grouped by the kind of primitive they exercise.
mod barrier;
mod counters;
mod locks;

/// Run a registered scenario by name and assert that it passed.
#[cfg(test)]
fn assert_passes(name: &str, sizing: crate::cli_args::SizingArgs) {
    let entry = crate::registry::get_scenarios()
        .find(|x| x.name() == name)
        .unwrap_or_else(|| panic!("No scenario named {name}"));
    let report = crate::scenario_runner::run_single_scenario(entry, &sizing);
    assert!(report.outcome.is_passed(), "{name}: {:?}", report.outcome);
}
