//! Task outcome records and the [`Log`] trait the engine writes through.

/// One line of the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Task id.
    pub task_id: String,
    /// Final status of the task.
    pub status: TaskStatus,
    /// Skip reason, pending change count or error text.
    pub message: Option<String>,
}

/// How a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskStatus {
    /// Changes were applied.
    Applied,
    /// Live state already matched the declaration.
    Unchanged,
    /// The task's condition was false.
    Skipped,
    /// Changes were planned but not applied.
    DryRun,
    /// Planning or execution failed.
    Failed,
}

impl TaskStatus {
    /// Every status in summary order.
    pub const ALL: [Self; 5] = [
        Self::Applied,
        Self::Unchanged,
        Self::Skipped,
        Self::DryRun,
        Self::Failed,
    ];

    /// Word used in the summary totals line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
        }
    }

    /// Summary icon and its ANSI color.
    #[must_use]
    pub const fn glyph(self) -> (&'static str, &'static str) {
        match self {
            Self::Applied => ("✓", "\x1b[32m"),
            Self::Unchanged => ("·", "\x1b[2m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::DryRun => ("~", "\x1b[37m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}

/// Sink for engine output.
///
/// The engine and modules only see this trait; [`Logger`](super::Logger)
/// is the production implementation.
pub trait Log: Send + Sync {
    /// Section header.
    fn stage(&self, msg: &str);
    /// Normal progress line.
    fn info(&self, msg: &str);
    /// Detail shown on the console only with `--verbose`.
    fn debug(&self, msg: &str);
    /// Warning.
    fn warn(&self, msg: &str);
    /// Error.
    fn error(&self, msg: &str);
    /// A change that would be made outside dry-run mode.
    fn dry_run(&self, msg: &str);
    /// Record a task outcome for the summary.
    fn record_task(&self, task_id: &str, status: TaskStatus, message: Option<&str>);
}
