// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed declaration repository and a fluent
// builder so each integration test can set up an isolated machine description
// without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotstate_cli::exec::SystemExecutor;
use dotstate_cli::logging::Logger;
use dotstate_cli::modules::registry::ModuleRegistry;
use dotstate_cli::platform::{Os, Platform};
use dotstate_cli::tasks::context::ExecutionContext;
use dotstate_cli::tasks::engine::{self, RunReport};
use dotstate_cli::tasks::load_tasks;
use dotstate_cli::variables::options::{Ambient, ResolutionOptions};
use dotstate_cli::variables::{VariableResolver, VariableTree};

/// Create the `variables/` and `jobs/` directories plus a `home/` directory
/// standing in for the user's home.
pub fn setup_minimal_repo(root: &Path) {
    for dir in ["variables", "jobs", "home"] {
        std::fs::create_dir_all(root.join(dir)).expect("create repo dir");
    }
}

/// An isolated test repository backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory containing the declaration repository.
    pub root: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a new context with an empty repository structure.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        setup_minimal_repo(root.path());
        Self { root }
    }

    /// Path to the repository root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Stand-in home directory inside the repository.
    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    /// Ambient values for `os` with `HOME` pointing at [`Self::home`].
    pub fn ambient(&self, os: Os) -> Ambient {
        self.ambient_with(os, &ResolutionOptions::default())
    }

    /// Ambient values for `os` with explicit overrides applied.
    pub fn ambient_with(&self, os: Os, options: &ResolutionOptions) -> Ambient {
        Ambient::new(
            &Platform::new(os, "bash", "test-host"),
            [
                ("HOME".to_string(), self.home().display().to_string()),
                ("USER".to_string(), "tester".to_string()),
            ],
            options,
        )
    }

    /// Resolve variables on the given platform.
    pub fn resolve(&self, os: Os) -> (VariableResolver, VariableTree) {
        let mut resolver = VariableResolver::new(self.root.path(), &self.ambient(os));
        let tree = resolver.load_all().expect("resolve variables");
        (resolver, tree)
    }

    /// Resolve variables, load jobs and run them once.
    pub fn run(&self, os: Os, dry_run: bool) -> (RunReport, Arc<Logger>) {
        let registry = ModuleRegistry::builtin();
        let (resolver, tree) = self.resolve(os);
        let tasks = load_tasks(self.root.path(), &registry).expect("load jobs");
        let log = Arc::new(Logger::new("test"));
        let ctx = ExecutionContext {
            base_path: self.root.path().to_path_buf(),
            variables: Arc::new(tree),
            dry_run,
            verbose: false,
            home: self.home(),
            log: Arc::clone(&log) as Arc<dyn dotstate_cli::logging::Log>,
            executor: Arc::new(SystemExecutor),
            renderer: Arc::new(resolver.into_renderer()),
        };
        (engine::run(&tasks, &registry, &ctx), log)
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context backed by an empty repository.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Write `content` to `variables/<filename>`.
    pub fn with_variables_file(self, filename: &str, content: &str) -> Self {
        self.with_file(&format!("variables/{filename}"), content)
    }

    /// Write `content` to `jobs/index.yaml`.
    pub fn with_job_index(self, content: &str) -> Self {
        self.with_file("jobs/index.yaml", content)
    }

    /// Write `content` to `rel` under the repository root, creating parents.
    pub fn with_file(self, rel: &str, content: &str) -> Self {
        let path = self.ctx.root.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write repo file");
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
