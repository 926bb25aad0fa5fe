//! Per-run state shared by every task.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::Executor;
use crate::logging::Log;
use crate::variables::VariableTree;
use crate::variables::template::TemplateRenderer;

/// Shared, read-only run parameters passed to every module call.
pub struct ExecutionContext {
    /// Repository root; relative `source` parameters resolve against it.
    pub base_path: PathBuf,
    /// Fully resolved variables for this run.
    pub variables: Arc<VariableTree>,
    /// Preview changes without applying them.
    pub dry_run: bool,
    /// Emit per-change detail while planning.
    pub verbose: bool,
    /// User's home directory, used for `~` expansion.
    pub home: PathBuf,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Renderer carrying the same ambient values the variables were resolved with.
    pub renderer: Arc<TemplateRenderer>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("base_path", &self.base_path)
            .field("variables", &self.variables)
            .field("dry_run", &self.dry_run)
            .field("verbose", &self.verbose)
            .field("home", &self.home)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("renderer", &"<TemplateRenderer>")
            .finish()
    }
}

impl ExecutionContext {
    /// Resolve a path parameter against the repository root.
    ///
    /// Absolute paths are returned unchanged; `~` expands to the home
    /// directory.
    #[must_use]
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let expanded = self.expand_home(raw);
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_path.join(expanded)
        }
    }

    /// Expand a leading `~` to the home directory.
    ///
    /// Relative paths without `~` are kept relative to the current directory.
    #[must_use]
    pub fn expand_home(&self, raw: &str) -> PathBuf {
        if raw == "~" {
            return self.home.clone();
        }
        raw.strip_prefix("~/")
            .or_else(|| raw.strip_prefix("~\\"))
            .map_or_else(|| Path::new(raw).to_path_buf(), |rest| self.home.join(rest))
    }
}
