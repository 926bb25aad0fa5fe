//! The production [`Log`] implementation.
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use super::format::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, TaskEntry, TaskStatus};
use super::sink::log_file_path;

/// Console and file logger that also collects task outcomes.
///
/// Messages go through [`tracing`]; the subscriber installed by
/// [`init_subscriber`](super::init_subscriber) decides where they land.
/// Every event reaches `$XDG_CACHE_HOME/dotstate/<command>.log` at debug
/// level whatever the console verbosity.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`.
    ///
    /// Only remembers where the log file lives; the file itself is opened
    /// by the subscriber.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Path of this command's log file, if the cache directory is usable.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Snapshot of the recorded task outcomes, in recording order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.entries.lock().map_or_else(|_| Vec::new(), |e| e.clone())
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tally().get(&TaskStatus::Failed).copied().unwrap_or(0)
    }

    fn tally(&self) -> BTreeMap<TaskStatus, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.task_entries() {
            *counts.entry(entry.status).or_insert(0) += 1;
        }
        counts
    }

    /// Print one line per recorded task followed by the totals.
    pub fn print_summary(&self) {
        let entries = self.task_entries();
        if entries.is_empty() {
            return;
        }

        self.stage("Summary");
        for entry in &entries {
            let (icon, color) = entry.status.glyph();
            let suffix = entry
                .message
                .as_deref()
                .map_or_else(String::new, |m| format!(" ({m})"));
            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.task_id));
        }

        let counts = self.tally();
        let mut totals = format!("{} tasks:", entries.len());
        for (i, status) in TaskStatus::ALL.into_iter().enumerate() {
            let (_, color) = status.glyph();
            let n = counts.get(&status).copied().unwrap_or(0);
            let sep = if i == 0 { " " } else { ", " };
            let _ = write!(totals, "{sep}{color}{n} {}\x1b[0m", status.label());
        }
        self.info(&totals);

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_task(&self, task_id: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(TaskEntry {
                task_id: task_id.to_string(),
                status,
                message: message.map(str::to_string),
            });
        }
    }
}
