//! Domain-specific error types for the dotstate engine.
//!
//! Internal modules return typed errors (e.g., [`LoadError`], [`PlanError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotstateError
//! ├── Variable(VariableError) : loading, merging and rendering variables
//! │   ├── Load(LoadError)
//! │   └── Template(TemplateError)
//! ├── Load(LoadError)         : job declaration files
//! ├── Plan(PlanError)         : per-task planning failures
//! └── NotFound(NotFoundError) : unknown variable, action or module
//! ```
//!
//! Load and variable errors abort a run before any task is planned.  Plan
//! errors are scoped to one task and converted into a failed task report by
//! the engine; they never propagate past the task boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the dotstate engine.
#[derive(Error, Debug)]
pub enum DotstateError {
    /// Variable resolution failed.
    #[error("variable resolution failed: {0}")]
    Variable(#[from] VariableError),

    /// A declaration file could not be loaded.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// A task could not be planned.
    #[error("planning error: {0}")]
    Plan(#[from] PlanError),

    /// A user-supplied name did not match anything.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),
}

/// Errors that arise while reading declaration files from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid YAML or TOML.
    #[error("cannot parse {}{}: {message}", path.display(), line.map_or_else(String::new, |l| format!(" (line {l})")))]
    Parse {
        /// Path of the malformed file.
        path: PathBuf,
        /// Line reported by the parser, when known.
        line: Option<usize>,
        /// Parser message.
        message: String,
    },

    /// The file parsed but its structure is not what the engine expects.
    #[error("invalid structure in {}: {message}", path.display())]
    Shape {
        /// Path of the offending file.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// The file extension is not one of the supported formats.
    #[error("unsupported declaration format: {} (expected .yaml, .yml or .toml)", path.display())]
    UnsupportedFormat {
        /// Path with the unsupported extension.
        path: PathBuf,
    },

    /// A directory import has no index file.
    #[error("no index file in {}", dir.display())]
    MissingIndex {
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// A directory index was reached again while it was still being loaded.
    #[error("import cycle through {}", path.display())]
    ImportCycle {
        /// Index file that closes the cycle.
        path: PathBuf,
    },

    /// Two tasks share the same id.
    #[error("duplicate task id '{id}' in {}", path.display())]
    DuplicateTaskId {
        /// Job index file.
        path: PathBuf,
        /// Repeated id.
        id: String,
    },
}

/// Errors produced while rendering template expressions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template engine rejected or failed to evaluate an expression.
    #[error("cannot render {location}: {message}")]
    Render {
        /// Where the template came from (variable key, import path, task field).
        location: String,
        /// Engine message.
        message: String,
    },

    /// Rendering did not reach a fixed point.
    #[error("unresolved template references after {passes} passes (cyclic or unterminated): {}", keys.join(", "))]
    Unresolved {
        /// Keys still containing template syntax.
        keys: Vec<String>,
        /// Number of passes performed.
        passes: usize,
    },

    /// A condition rendered to something that is not boolean-like.
    #[error("condition '{expression}' rendered to '{value}', expected a boolean")]
    NotBoolean {
        /// Condition source text.
        expression: String,
        /// Rendered output.
        value: String,
    },
}

/// Errors produced by the variable resolution engine.
#[derive(Error, Debug)]
pub enum VariableError {
    /// A variable file could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// An import path, condition or variable value could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Two sources declare the same key with incompatible shapes.
    #[error("cannot merge '{key}' from {}: {existing} cannot be replaced by {incoming}", origin.display())]
    Merge {
        /// Dotted key path.
        key: String,
        /// Source that introduced the incompatible value.
        origin: PathBuf,
        /// Kind already present in the tree.
        existing: &'static str,
        /// Kind of the incoming value.
        incoming: &'static str,
    },
}

/// Errors scoped to planning a single task.
#[derive(Error, Debug)]
pub enum PlanError {
    /// The task's condition could not be evaluated.
    #[error("task '{task}': invalid condition: {source}")]
    Condition {
        /// Task id.
        task: String,
        /// Rendering failure.
        source: TemplateError,
    },

    /// A renderable parameter could not be rendered.
    #[error("task '{task}': cannot render field '{field}': {source}")]
    Field {
        /// Task id.
        task: String,
        /// Parameter name.
        field: String,
        /// Rendering failure.
        source: TemplateError,
    },

    /// No module is registered for the task's action.
    #[error("task '{task}': unknown action '{action}'")]
    UnknownAction {
        /// Task id.
        task: String,
        /// Unregistered action name.
        action: String,
    },

    /// The module rejected the parameters or the live state.
    #[error("task '{task}': {message}")]
    Module {
        /// Task id.
        task: String,
        /// Module failure, including its context chain.
        message: String,
    },
}

impl PlanError {
    /// Id of the task that failed to plan.
    #[must_use]
    pub fn task(&self) -> &str {
        match self {
            Self::Condition { task, .. }
            | Self::Field { task, .. }
            | Self::UnknownAction { task, .. }
            | Self::Module { task, .. } => task,
        }
    }
}

/// User-input errors for lookups by name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// No variable exists at the given key path.
    #[error("variable not found: {0}")]
    Variable(String),

    /// No module is registered under the given action name.
    #[error("unknown action: {0}")]
    Action(String),

    /// No module group has the given name.
    #[error("unknown module: {0}")]
    Module(String),
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn load_error_io_mentions_path() {
        let e = LoadError::Io {
            path: PathBuf::from("/repo/variables/index.yaml"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("/repo/variables/index.yaml"));
        assert!(e.to_string().contains("no such file"));
    }

    #[test]
    fn load_error_parse_includes_line_when_known() {
        let e = LoadError::Parse {
            path: PathBuf::from("global.yaml"),
            line: Some(4),
            message: "did not find expected key".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "cannot parse global.yaml (line 4): did not find expected key"
        );
    }

    #[test]
    fn load_error_parse_without_line() {
        let e = LoadError::Parse {
            path: PathBuf::from("jobs.toml"),
            line: None,
            message: "expected `=`".to_string(),
        };
        assert_eq!(e.to_string(), "cannot parse jobs.toml: expected `=`");
    }

    #[test]
    fn template_error_unresolved_lists_keys() {
        let e = TemplateError::Unresolved {
            keys: vec!["a".to_string(), "b".to_string()],
            passes: 10,
        };
        assert!(e.to_string().contains("a, b"));
        assert!(e.to_string().contains("10 passes"));
    }

    #[test]
    fn variable_error_merge_display() {
        let e = VariableError::Merge {
            key: "editor".to_string(),
            origin: PathBuf::from("linux.yaml"),
            existing: "mapping",
            incoming: "sequence",
        };
        assert_eq!(
            e.to_string(),
            "cannot merge 'editor' from linux.yaml: mapping cannot be replaced by sequence"
        );
    }

    #[test]
    fn plan_error_names_task_and_field() {
        let e = PlanError::Field {
            task: "symlink-1".to_string(),
            field: "target".to_string(),
            source: TemplateError::Render {
                location: "target".to_string(),
                message: "undefined value".to_string(),
            },
        };
        assert!(e.to_string().contains("symlink-1"));
        assert!(e.to_string().contains("'target'"));
        assert_eq!(e.task(), "symlink-1");
    }

    #[test]
    fn not_found_display() {
        assert_eq!(
            NotFoundError::Variable("user.name".to_string()).to_string(),
            "variable not found: user.name"
        );
        assert_eq!(
            NotFoundError::Action("frobnicate".to_string()).to_string(),
            "unknown action: frobnicate"
        );
    }

    #[test]
    fn dotstate_error_from_variable_error() {
        let inner = VariableError::Template(TemplateError::NotBoolean {
            expression: "{{ x }}".to_string(),
            value: "banana".to_string(),
        });
        let e: DotstateError = inner.into();
        assert!(e.to_string().contains("variable resolution failed"));
        assert!(e.to_string().contains("banana"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<DotstateError>();
        assert_send_sync::<LoadError>();
        assert_send_sync::<TemplateError>();
        assert_send_sync::<VariableError>();
        assert_send_sync::<PlanError>();
        assert_send_sync::<NotFoundError>();
    }

    #[test]
    fn errors_convert_to_anyhow() {
        let e = NotFoundError::Module("nope".to_string());
        let _anyhow_err: anyhow::Error = e.into();
        let e = PlanError::UnknownAction {
            task: "t".to_string(),
            action: "a".to_string(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
