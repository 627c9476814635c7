mod list;
mod run;

use crate::cli_args;

/// Figure out what command to run, then run it.
pub fn dispatch_command(args: cli_args::CliArgs) {
    match &args.command {
        cli_args::Command::List(l) => list::list(&args, l),
        cli_args::Command::Run(r) => run::run(&args, r),
    }
}
