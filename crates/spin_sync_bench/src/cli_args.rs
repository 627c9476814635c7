//! Definition of the Clap command line.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run scenarios.
    Run(RunArgs),

    /// List all scenarios.
    List(ListArgs),
}

#[derive(Debug, Parser)]
pub struct FilterArgs {
    /// If specified, filter scenarios with this glob pattern.
    pub pattern: Option<String>,
}

/// Overrides applied on top of each scenario's own configuration.
#[derive(Debug, Default, Parser)]
pub struct SizingArgs {
    /// Comma-separated thread counts to sweep, e.g. `1,2,4,8`.
    #[arg(long, value_delimiter = ',')]
    pub threads: Vec<usize>,

    /// Iterations per thread.
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Units of busy work done inside each critical section.
    #[arg(long)]
    pub work: Option<u64>,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub sizing: SizingArgs,

    /// Also write every scenario's outcome and timings to this file as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// List all scenarios, optionally constrained by a filter.
#[derive(Debug, Parser)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}
