//! Infrastructure to report the results of running a scenario.
//!
//! This is called from [crate::scenario_runner] to display the outcome of each scenario as it finishes.
use std::fmt::{Result, Write};

use indenter::indented;
use itertools::Itertools;

use crate::outcome::{Measurement, ScenarioOutcome, ScenarioReport, ValidationFailure};

// As with most string building, the root is `report_scenario`, which unwraps once and strips the trailing newline so
// that everything below can use writeln.

/// Report the outcome of a scenario, followed by its timings if it recorded any.
///
/// Returns a string without a trailing newline.
pub fn report_scenario(report: &ScenarioReport) -> String {
    let mut dest = String::new();
    report_scenario_fallible(&mut dest, report)
        .expect("This is formatting to strings and should never fail");

    let Some(stripped) = dest.strip_suffix('\n') else {
        return dest;
    };
    stripped.to_string()
}

fn report_scenario_fallible(mut dest: &mut dyn Write, report: &ScenarioReport) -> Result {
    write!(dest, "{} ", report.name)?;

    match &report.outcome {
        ScenarioOutcome::Passed => writeln!(dest, "passed")?,
        ScenarioOutcome::Panicked { message } => {
            writeln!(dest, "panicked")?;
            writeln!(indented(&mut dest).with_str("  "), "{message}")?;
        }
        ScenarioOutcome::RunnerFailed { reason } => {
            writeln!(dest, "runner failed")?;
            writeln!(indented(&mut dest).with_str("  "), "Reason: {reason}")?;
        }
        ScenarioOutcome::ValidationFailed { failures } => {
            writeln!(dest, "failed validation")?;
            report_failures(&mut indented(&mut dest).with_str("  "), failures)?;
        }
    }

    if !report.measurements.is_empty() {
        report_timings(&mut indented(&mut dest).with_str("  "), &report.measurements)?;
    }

    Ok(())
}

fn report_failures(dest: &mut dyn Write, failures: &[ValidationFailure]) -> Result {
    writeln!(dest, "{} checks have failed", failures.len())?;
    for f in failures {
        writeln!(dest, "{}: expected {}, got {}", f.check, f.expected, f.actual)?;
    }
    Ok(())
}

/// A table with one row per thread count and one column per variant.
fn report_timings(dest: &mut dyn Write, measurements: &[Measurement]) -> Result {
    let variants = measurements
        .iter()
        .map(|m| m.variant.as_str())
        .unique()
        .collect::<Vec<_>>();
    let thread_counts = measurements
        .iter()
        .map(|m| m.threads)
        .unique()
        .sorted()
        .collect::<Vec<_>>();

    let mut rows = vec![std::iter::once("threads")
        .chain(variants.iter().copied())
        .map(str::to_string)
        .collect::<Vec<_>>()];

    for threads in thread_counts {
        let mut row = vec![threads.to_string()];
        for v in variants.iter() {
            let cell = measurements
                .iter()
                .find(|m| m.threads == threads && m.variant == *v)
                .map(|m| format!("{:.3}ms", m.elapsed_ms))
                .unwrap_or_else(|| "-".to_string());
            row.push(cell);
        }
        rows.push(row);
    }

    let widths = (0..rows[0].len())
        .map(|col| rows.iter().map(|r| r[col].len()).max().unwrap_or(0))
        .collect::<Vec<_>>();

    writeln!(dest, "Timings:")?;
    for row in rows {
        let line = row
            .iter()
            .zip(widths.iter().copied())
            .map(|(cell, width)| format!("{cell:<width$}"))
            .join("  ");
        writeln!(dest, "  {}", line.trim_end())?;
    }

    Ok(())
}
