//! Variable index files: ordered imports plus optional inline variables.
//!
//! ```yaml
//! imports:
//!   - path: global.yaml
//!   - path: linux.yaml
//!     condition: "{{ Platform.OS == 'linux' }}"
//!   - hosts/{{ Platform.Hostname }}.yaml
//! variables:
//!   editor: vim
//! ```
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{LoadedFile, Mapping, Scalar, Value};
use crate::error::LoadError;

/// One entry of an index's `imports` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Path relative to the index's directory; may contain templates.
    pub path: String,
    /// Optional condition gating the import.
    pub condition: Option<String>,
}

/// A parsed variable index.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableIndex {
    /// Imports in declaration order.
    pub imports: Vec<Import>,
    /// Inline variables declared in the index itself.
    pub variables: Mapping,
    /// Source lines of inline variable keys, relative to `variables`.
    pub lines: BTreeMap<String, usize>,
}

impl VariableIndex {
    /// Interpret a loaded file as a variable index.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Shape`] if the document has unknown top-level
    /// keys or if `imports`/`variables` have the wrong shape.
    pub fn from_file(file: &LoadedFile) -> Result<Self, LoadError> {
        let shape = |message: String| LoadError::Shape {
            path: file.path.clone(),
            message,
        };

        let Value::Mapping(root) = &file.tree else {
            return Err(shape(format!(
                "index must be a mapping, found {}",
                file.tree.kind()
            )));
        };

        if let Some(unknown) = root
            .keys()
            .find(|k| !matches!(k.as_str(), "imports" | "variables"))
        {
            return Err(shape(format!(
                "unknown key '{unknown}' (expected 'imports' or 'variables')"
            )));
        }

        let imports = match root.get("imports") {
            None => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_import(item).map_err(|m| shape(format!("imports[{i}]: {m}"))))
                .collect::<Result<_, _>>()?,
            Some(Value::Scalar(Scalar::Null)) => Vec::new(),
            Some(other) => {
                return Err(shape(format!(
                    "'imports' must be a sequence, found {}",
                    other.kind()
                )));
            }
        };

        let variables = match root.get("variables") {
            None | Some(Value::Scalar(Scalar::Null)) => Mapping::new(),
            Some(Value::Mapping(m)) => m.clone(),
            Some(other) => {
                return Err(shape(format!(
                    "'variables' must be a mapping, found {}",
                    other.kind()
                )));
            }
        };

        let lines = file
            .lines
            .iter()
            .filter_map(|(k, line)| {
                k.strip_prefix("variables.")
                    .map(|rest| (rest.to_string(), *line))
            })
            .collect();

        Ok(Self {
            imports,
            variables,
            lines,
        })
    }

    /// Directory that import paths are relative to.
    #[must_use]
    pub fn base_dir(index_path: &Path) -> &Path {
        index_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

fn parse_import(item: &Value) -> Result<Import, String> {
    match item {
        Value::Scalar(Scalar::String(path)) => Ok(Import {
            path: path.clone(),
            condition: None,
        }),
        Value::Mapping(m) => {
            if let Some(unknown) = m
                .keys()
                .find(|k| !matches!(k.as_str(), "path" | "condition"))
            {
                return Err(format!(
                    "unknown key '{unknown}' (expected 'path' or 'condition')"
                ));
            }
            let path = m
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| "missing string field 'path'".to_string())?
                .to_string();
            let condition = match m.get("condition") {
                None | Some(Value::Scalar(Scalar::Null)) => None,
                Some(Value::Scalar(s)) => Some(s.to_string()),
                Some(other) => {
                    return Err(format!(
                        "'condition' must be a scalar, found {}",
                        other.kind()
                    ));
                }
            };
            Ok(Import { path, condition })
        }
        other => Err(format!(
            "expected a path string or a mapping, found {}",
            other.kind()
        )),
    }
}
