//! Turning tracing events into console and log-file lines.
use std::fmt::Write as _;

use tracing::{Event, Level, field::Field};

/// Target used for stage headers.
pub const STAGE_TARGET: &str = "dotstate::stage";

/// Target used for dry-run action lines.
pub const DRY_RUN_TARGET: &str = "dotstate::dry_run";

/// How an event is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Stage,
    DryRun,
    Info,
    Warn,
    Error,
    Debug,
}

impl Kind {
    pub(super) fn of(event: &Event<'_>) -> Self {
        let meta = event.metadata();
        match (*meta.level(), meta.target()) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Console rendering, colors included.
    pub(super) fn console(self, text: &str) -> String {
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{text}\x1b[0m"),
            Self::DryRun => format!("  \x1b[33m[DRY RUN]\x1b[0m {text}"),
            Self::Info => format!("  {text}"),
            Self::Warn => format!("\x1b[33mWARN\x1b[0m  {text}"),
            Self::Error => format!("\x1b[31mERROR\x1b[0m {text}"),
            Self::Debug => format!("  \x1b[2m{text}\x1b[0m"),
        }
    }

    /// Plain rendering for the log file, without the timestamp.
    pub(super) fn plain(self, text: &str) -> String {
        let tag = match self {
            Self::Stage => return format!("==> {text}"),
            Self::Info => return format!("    {text}"),
            Self::DryRun => "dry run",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
        };
        format!("    [{tag}] {text}")
    }
}

/// Collects an event's message and appends its other fields as ` key=value`.
#[derive(Debug, Default)]
pub(super) struct EventText(String, String);

impl EventText {
    pub(super) fn from_event(event: &Event<'_>) -> String {
        let mut text = Self::default();
        event.record(&mut text);
        text.0 + &text.1
    }
}

impl tracing::field::Visit for EventText {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        } else {
            let _ = write!(self.1, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        } else {
            let _ = write!(self.1, " {}={value:?}", field.name());
        }
    }
}

/// Remove ANSI CSI sequences (`ESC [ ... final-byte`) and lone escapes.
pub(super) fn strip_ansi(text: &str) -> String {
    enum State {
        Text,
        Escape,
        Csi,
    }
    let mut state = State::Text;
    text.chars()
        .filter(|&c| match state {
            State::Text if c == '\x1b' => {
                state = State::Escape;
                false
            }
            State::Text => true,
            State::Escape => {
                state = if c == '[' { State::Csi } else { State::Text };
                false
            }
            State::Csi => {
                if ('@'..='~').contains(&c) {
                    state = State::Text;
                }
                false
            }
        })
        .collect()
}
