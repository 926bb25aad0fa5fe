//! Command-line surface.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the dotstate engine.
#[derive(Parser, Debug)]
#[command(
    name = "dotstate",
    about = "Declarative machine state: layered variables, planned and idempotent jobs",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Flags shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// Short command name used for the log file.
    #[must_use]
    pub const fn command_name(&self) -> &'static str {
        match self.command {
            Command::Apply => "apply",
            Command::Plan => "plan",
            Command::Vars(_) => "vars",
            Command::Actions => "actions",
            Command::Explain(_) => "explain",
            Command::Version => "version",
        }
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Repository root (default: $DOTSTATE_ROOT, else the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Platform override used for conditions and templates (linux, darwin, windows)
    #[arg(long, global = true)]
    pub platform: Option<String>,

    /// Shell override
    #[arg(long, global = true)]
    pub shell: Option<String>,

    /// Hostname override
    #[arg(long, global = true)]
    pub hostname: Option<String>,

    /// Environment override as KEY=VALUE (repeatable; first occurrence wins)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", global = true)]
    pub env: Vec<String>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan and apply every job
    Apply,
    /// Show what apply would change (apply with --dry-run)
    Plan,
    /// Inspect resolved variables
    Vars(VarsOpts),
    /// List supported actions
    Actions,
    /// Describe an action or a module
    Explain(ExplainOpts),
    /// Print version information
    Version,
}

/// Options for the `vars` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct VarsOpts {
    /// What to show.
    #[command(subcommand)]
    pub command: VarsCommand,
}

/// `vars` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum VarsCommand {
    /// Print the resolved value of a dotted key
    Get {
        /// Dotted key path, e.g. editor.default
        key: String,
    },
    /// Show which sources set a key, in load order
    Trace {
        /// Dotted key path
        key: String,
    },
    /// List every loaded variable source
    Sources,
    /// Print the whole resolved tree
    Dump {
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

/// Options for the `explain` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ExplainOpts {
    /// Action to describe
    #[arg(required_unless_present = "module", conflicts_with = "module")]
    pub action: Option<String>,

    /// Describe every action of a module group instead
    #[arg(long)]
    pub module: Option<String>,
}
