//! Commands: `apply` and `plan`.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::modules::registry::ModuleRegistry;
use crate::tasks::context::ExecutionContext;
use crate::tasks::{self, engine};

/// Run the apply command (or `plan`, when `dry_run` is forced).
///
/// # Errors
///
/// Returns an error if variables or jobs fail to load, or if any task failed
/// to plan or apply during a real run.
pub fn run(global: &GlobalOpts, verbose: bool, dry_run: bool, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("dotstate {}", super::version::version()));

    let setup = CommandSetup::init(global, log)?;
    let registry = ModuleRegistry::builtin();

    log.stage("Loading jobs");
    let jobs = tasks::load_tasks(&setup.root, &registry)?;
    log.info(&format!("loaded {} task(s)", jobs.len()));

    if dry_run {
        log.stage("Planning (dry run)");
    } else {
        log.stage("Applying");
    }
    let ctx = build_context(setup, verbose, dry_run, log);
    let report = engine::run(&jobs, &registry, &ctx);

    log.print_summary();

    if !report.success() {
        anyhow::bail!("{} task(s) failed", report.failed());
    }
    Ok(())
}

/// Assemble the read-only context shared by every task of a run.
#[must_use]
pub fn build_context(
    setup: CommandSetup,
    verbose: bool,
    dry_run: bool,
    log: &Arc<Logger>,
) -> ExecutionContext {
    let home = if setup.ambient.user.home.is_empty() {
        std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default()
    } else {
        PathBuf::from(&setup.ambient.user.home)
    };
    ExecutionContext {
        base_path: setup.root,
        variables: Arc::new(setup.variables),
        dry_run,
        verbose,
        home,
        log: Arc::clone(log) as Arc<dyn Log>,
        executor: Arc::new(SystemExecutor),
        renderer: Arc::new(setup.resolver.into_renderer()),
    }
}
