//! Subcommand implementations and their shared setup.
pub mod apply;
pub mod explain;
pub mod vars;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{JOBS_DIR, VARIABLES_DIR};
use crate::logging::{Log as _, Logger};
use crate::variables::options::{Ambient, ResolutionOptions, parse_env_pairs};
use crate::variables::{VariableResolver, VariableTree};

/// Shared state produced by the common command setup sequence.
///
/// Resolves the repository root, builds the ambient template context from the
/// CLI overrides and loads every variable source, so each command starts from
/// the same resolved tree.
#[derive(Debug)]
pub struct CommandSetup {
    /// Canonical repository root.
    pub root: PathBuf,
    /// Platform, environment and user context for templates.
    pub ambient: Ambient,
    /// Resolver that produced `variables`, kept for provenance queries.
    pub resolver: VariableResolver,
    /// Fully merged and rendered variables.
    pub variables: VariableTree,
}

impl CommandSetup {
    /// Locate the repository, detect the platform and resolve all variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be determined, an
    /// `--env` override is malformed, or variable resolution fails.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let root = resolve_root(global)?;
        let options = resolution_options(global)?;
        let ambient = Ambient::detect(&options);
        log.debug(&format!("root: {}", root.display()));
        log.debug(&format!(
            "platform: {} ({}) shell={} host={}",
            ambient.platform.os,
            ambient.platform.arch,
            ambient.platform.shell,
            ambient.platform.hostname
        ));

        log.stage("Resolving variables");
        let mut resolver = VariableResolver::new(&root, &ambient);
        let variables = resolver.load_all()?;
        log.info(&format!(
            "loaded {} variable source(s)",
            resolver.sources().len()
        ));

        Ok(Self {
            root,
            ambient,
            resolver,
            variables,
        })
    }
}

/// Translate the global CLI flags into resolution overrides.
///
/// # Errors
///
/// Returns an error if an `--env` pair is not `KEY=VALUE`.
pub fn resolution_options(global: &GlobalOpts) -> Result<ResolutionOptions> {
    Ok(ResolutionOptions {
        platform: global.platform.clone(),
        shell: global.shell.clone(),
        hostname: global.hostname.clone(),
        environment: parse_env_pairs(&global.env)?,
    })
}

/// Resolve the repository root from CLI arguments, `DOTSTATE_ROOT` or the
/// current directory.
///
/// # Errors
///
/// Returns an error if no root can be determined or it does not exist.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    let env_root = std::env::var_os("DOTSTATE_ROOT").map(PathBuf::from);
    let cwd = std::env::current_dir()?;
    resolve_root_from(global.root.as_deref(), env_root.as_deref(), &cwd)
}

fn resolve_root_from(explicit: Option<&Path>, env_root: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let candidate = match (explicit, env_root) {
        (Some(root), _) | (None, Some(root)) => root.to_path_buf(),
        (None, None) if cwd.join(VARIABLES_DIR).is_dir() || cwd.join(JOBS_DIR).is_dir() => {
            cwd.to_path_buf()
        }
        (None, None) => {
            anyhow::bail!(
                "cannot determine repository root. Use --root or set DOTSTATE_ROOT env var"
            )
        }
    };
    dunce::canonicalize(&candidate)
        .with_context(|| format!("repository root {} does not exist", candidate.display()))
}
