//! `dotstate` command-line entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use dotstate_cli::cli::{Cli, Command};
use dotstate_cli::commands;
use dotstate_cli::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let command = args.command_name();
    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(Logger::new(command));

    let mut stdout = std::io::stdout().lock();
    match &args.command {
        Command::Apply => commands::apply::run(&args.global, args.verbose, args.global.dry_run, &log),
        Command::Plan => commands::apply::run(&args.global, args.verbose, true, &log),
        Command::Vars(opts) => commands::vars::run(&args.global, opts, &log, &mut stdout),
        Command::Actions => commands::explain::run_actions(&mut stdout),
        Command::Explain(opts) => commands::explain::run(opts, &mut stdout),
        Command::Version => commands::version::run(&mut stdout),
    }
}
