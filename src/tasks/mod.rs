//! Declared units of work and the engine that plans and applies them.
//!
//! Tasks come from `jobs/index.*`.  Each top-level key names an action and
//! holds that action's items:
//!
//! ```yaml
//! ensure_dir:
//!   - path: ~/.config/nvim
//! install: [git, neovim]            # scalar shorthand for the primary param
//! symlink:
//!   condition: Platform.OS != "windows"
//!   items:
//!     - source: files/zshrc
//!       target: ~/.zshrc
//!       id: zshrc
//! ```
pub mod context;
pub mod engine;

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::config::{self, Mapping, Scalar, Value, find_index, load_sections};
use crate::error::LoadError;
use crate::modules::Module;
use crate::modules::registry::ModuleRegistry;

/// Parameter used for scalar items of a section whose action has no module.
const FALLBACK_PRIMARY_PARAM: &str = "name";

/// One declared unit of desired-state work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    /// Unique id: explicit `id`, else `<action>-<n>` (1-based per section).
    pub id: String,
    /// Module routing key.
    pub action: String,
    /// Module-specific parameters with `id` and `condition` removed.
    pub parameters: Mapping,
    /// Conditions that must all hold; the section condition comes first.
    pub conditions: Vec<String>,
}

/// Load the job index of the repository at `root`.
///
/// # Errors
///
/// Returns [`LoadError::MissingIndex`] if `jobs/` has no index, any load
/// error from reading it, [`LoadError::Shape`] for malformed sections, and
/// [`LoadError::DuplicateTaskId`] if two tasks share an id.
pub fn load_tasks(root: &Path, registry: &ModuleRegistry) -> Result<Vec<Task>, LoadError> {
    let dir = root.join(config::JOBS_DIR);
    let path = find_index(&dir).ok_or(LoadError::MissingIndex { dir })?;
    tracing::debug!(path = %path.display(), "loading job index");
    parse_sections(&path, load_sections(&path)?, registry)
}

/// Turn ordered job sections into tasks.
///
/// # Errors
///
/// See [`load_tasks`].
pub fn parse_sections(
    path: &Path,
    sections: Vec<(String, Value)>,
    registry: &ModuleRegistry,
) -> Result<Vec<Task>, LoadError> {
    let mut tasks = Vec::new();
    let mut seen = HashSet::new();
    for (action, body) in sections {
        let primary = registry
            .get(&action)
            .map_or(FALLBACK_PRIMARY_PARAM, Module::primary_param);
        let (section_condition, items) = split_section(path, &action, body)?;
        for (idx, item) in items.into_iter().enumerate() {
            let task = build_task(path, &action, idx + 1, item, primary, section_condition.as_ref())?;
            if !seen.insert(task.id.clone()) {
                return Err(LoadError::DuplicateTaskId {
                    path: path.to_path_buf(),
                    id: task.id,
                });
            }
            tasks.push(task);
        }
    }
    Ok(tasks)
}

fn shape(path: &Path, message: String) -> LoadError {
    LoadError::Shape {
        path: path.to_path_buf(),
        message,
    }
}

/// Stringify a condition; `null` means "no condition".
fn condition_text(path: &Path, context: &str, value: Value) -> Result<Option<String>, LoadError> {
    match value {
        Value::Scalar(Scalar::Null) => Ok(None),
        Value::Scalar(s) => Ok(Some(s.to_string())),
        other => Err(shape(
            path,
            format!("{context}: condition must be a scalar, found {}", other.kind()),
        )),
    }
}

fn split_section(
    path: &Path,
    action: &str,
    body: Value,
) -> Result<(Option<String>, Vec<Value>), LoadError> {
    match body {
        Value::Scalar(Scalar::Null) => Ok((None, Vec::new())),
        Value::Sequence(items) => Ok((None, items)),
        Value::Mapping(mut map) => {
            let condition = match map.remove("condition") {
                Some(c) => condition_text(path, action, c)?,
                None => None,
            };
            let items = match map.remove("items") {
                Some(Value::Sequence(items)) => items,
                Some(Value::Scalar(Scalar::Null)) | None => Vec::new(),
                Some(other) => {
                    return Err(shape(
                        path,
                        format!("{action}: items must be a list, found {}", other.kind()),
                    ));
                }
            };
            if let Some(key) = map.keys().next() {
                return Err(shape(
                    path,
                    format!("{action}: unknown section key '{key}' (expected condition, items)"),
                ));
            }
            Ok((condition, items))
        }
        Value::Scalar(_) => Err(shape(
            path,
            format!("{action}: expected a list of items or {{condition, items}}"),
        )),
    }
}

fn build_task(
    path: &Path,
    action: &str,
    position: usize,
    item: Value,
    primary: &str,
    section_condition: Option<&String>,
) -> Result<Task, LoadError> {
    let context = format!("{action} item {position}");
    let mut parameters = match item {
        Value::Mapping(map) => map,
        Value::Scalar(Scalar::Null) | Value::Sequence(_) => {
            return Err(shape(
                path,
                format!("{context}: expected a mapping or a scalar, found {}", item.kind()),
            ));
        }
        scalar @ Value::Scalar(_) => Mapping::from([(primary.to_string(), scalar)]),
    };

    let id = match parameters.remove("id") {
        Some(Value::Scalar(s)) if !matches!(s, Scalar::Null) => s.to_string(),
        Some(other) if !other.is_null() => {
            return Err(shape(path, format!("{context}: id must be a scalar")));
        }
        _ => format!("{action}-{position}"),
    };

    let mut conditions: Vec<String> = section_condition.cloned().into_iter().collect();
    if let Some(c) = parameters.remove("condition") {
        conditions.extend(condition_text(path, &context, c)?);
    }

    Ok(Task {
        id,
        action: action.to_string(),
        parameters,
        conditions,
    })
}
