//! Console and log-file output built on [`tracing`].
//!
//! [`Logger`] is what commands hold; the engine only sees the [`Log`] trait.

mod format;
mod logger;
mod sink;
mod types;

pub use format::{DRY_RUN_TARGET, STAGE_TARGET};
pub use logger::Logger;
pub use sink::{LOG_ENV, init_subscriber};
pub use types::{Log, TaskEntry, TaskStatus};
