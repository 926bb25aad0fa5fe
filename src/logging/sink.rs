//! Where log output goes: the per-command file and the console.
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::format::{EventText, Kind, strip_ansi};

/// Environment variable overriding the console filter (`EnvFilter` syntax).
pub const LOG_ENV: &str = "DOTSTATE_LOG";

/// `<cache>/dotstate/<command>.log`, creating the directory on the way.
///
/// The cache is `$XDG_CACHE_HOME`, falling back to `~/.cache`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".cache"))
        })?;
    let dir = cache.join("dotstate");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Layer writing every event it sees to the command's log file.
///
/// The file is truncated when the layer is created, so it always holds the
/// latest run only.
#[derive(Debug)]
pub(super) struct LogFile {
    file: Mutex<File>,
}

impl LogFile {
    /// `None` when the cache directory or file is unusable.
    pub(super) fn open(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()?;
        let rule = "-".repeat(48);
        writeln!(
            file,
            "{rule}\ndotstate {} {command} started {}\n{rule}",
            crate::commands::version::version(),
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        )
        .ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for LogFile {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let text = strip_ansi(&EventText::from_event(event));
        let line = Kind::of(event).plain(&text);
        let stamp = chrono::Utc::now().format("%H:%M:%S");
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "[{stamp}] {line}");
        }
    }
}

/// Console event format: colored stage headers, indented progress lines.
struct Console;

impl<S, N> FormatEvent<S, N> for Console
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let text = EventText::from_event(event);
        writeln!(writer, "{}", Kind::of(event).console(&text))
    }
}

/// Install the global subscriber. Call once, before anything logs.
///
/// Warnings and errors go to stderr, everything else to stdout. The console
/// shows `info` and above (`debug` with `verbose`) unless [`LOG_ENV`] holds a
/// filter directive. The log file always receives `debug` and above.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .or_else(std::io::stdout);
    let console = tracing_subscriber::fmt::layer()
        .event_format(Console)
        .with_writer(writer)
        .with_filter(filter);

    let file = LogFile::open(command).map(|layer| layer.with_filter(LevelFilter::DEBUG));

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
