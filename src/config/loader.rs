//! Declaration file parsing (YAML and TOML) into [`Value`] trees.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::value::{Mapping, Scalar, Value, join_key};
use crate::error::LoadError;

/// Supported declaration file formats, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl Format {
    /// Determine the format of `path` from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// A parsed declaration file.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Path the file was read from.
    pub path: PathBuf,
    /// Parsed tree; an empty document yields an empty mapping.
    pub tree: Value,
    /// 1-based line on which each dotted key path is declared.
    pub lines: BTreeMap<String, usize>,
}

/// Read and parse a declaration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unsupported
/// extension, or does not parse into a string-keyed tree.
pub fn load_file(path: &Path) -> Result<LoadedFile, LoadError> {
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tree = parse_tree(path, format, &text)?;
    let lines = locate_keys(path, &text)?;
    Ok(LoadedFile {
        path: path.to_path_buf(),
        tree,
        lines,
    })
}

/// Read and parse a declaration file, discarding line information.
///
/// # Errors
///
/// Same as [`load_file`].
pub fn load_tree(path: &Path) -> Result<Value, LoadError> {
    load_file(path).map(|file| file.tree)
}

/// Map every dotted key path declared in `text` to its 1-based line.
///
/// The format is taken from the extension of `path`.  Keys the locator
/// cannot see (flow mappings, inline tables) are simply absent.
///
/// # Errors
///
/// Returns [`LoadError::UnsupportedFormat`] for unknown extensions.
pub fn locate_keys(path: &Path, text: &str) -> Result<BTreeMap<String, usize>, LoadError> {
    Ok(match Format::from_path(path)? {
        Format::Yaml => locate_yaml_keys(text),
        Format::Toml => locate_toml_keys(text),
    })
}

/// Parse `text` in the given format.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] on syntax errors and [`LoadError::Shape`]
/// when the document uses constructs the engine does not model (non-string
/// keys, YAML tags).
pub fn parse_tree(path: &Path, format: Format, text: &str) -> Result<Value, LoadError> {
    match format {
        Format::Yaml => match from_yaml(path, parse_yaml(path, text)?)? {
            Value::Scalar(Scalar::Null) => Ok(Value::default()),
            tree => Ok(tree),
        },
        Format::Toml => Ok(from_toml_table(parse_toml(path, text)?)),
    }
}

fn parse_yaml(path: &Path, text: &str) -> Result<serde_yaml::Value, LoadError> {
    serde_yaml::from_str(text).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })
}

fn parse_toml(path: &Path, text: &str) -> Result<toml::Table, LoadError> {
    toml::from_str(text).map_err(|e| {
        let line = e
            .span()
            .map(|span| text.get(..span.start).map_or(0, |s| s.matches('\n').count()) + 1);
        LoadError::Parse {
            path: path.to_path_buf(),
            line,
            message: e.message().to_string(),
        }
    })
}

/// Read a file whose top-level keys are significant in declaration order.
///
/// Job indexes route each top-level key to a module and run the sections in
/// the order they are written, which a [`Mapping`] would not preserve.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if its top
/// level is not a mapping.
pub fn load_sections(path: &Path) -> Result<Vec<(String, Value)>, LoadError> {
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let shape = |message: String| LoadError::Shape {
        path: path.to_path_buf(),
        message,
    };
    match format {
        Format::Yaml => match parse_yaml(path, &text)? {
            serde_yaml::Value::Null => Ok(Vec::new()),
            serde_yaml::Value::Mapping(entries) => entries
                .into_iter()
                .map(|(k, v)| match k {
                    serde_yaml::Value::String(key) => Ok((key, from_yaml(path, v)?)),
                    other => Err(shape(format!("section names must be strings, found {other:?}"))),
                })
                .collect(),
            other => Err(shape(format!(
                "top level must be a mapping of sections, found {}",
                from_yaml(path, other)?.kind()
            ))),
        },
        Format::Toml => Ok(parse_toml(path, &text)?
            .into_iter()
            .map(|(k, v)| (k, from_toml(v)))
            .collect()),
    }
}

/// Look for `index.yaml`, `index.yml` or `index.toml` in `dir`.
#[must_use]
pub fn find_index(dir: &Path) -> Option<PathBuf> {
    ["index.yaml", "index.yml", "index.toml"]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

fn from_yaml(path: &Path, value: serde_yaml::Value) -> Result<Value, LoadError> {
    use serde_yaml::Value as Y;
    Ok(match value {
        Y::Null => Value::Scalar(Scalar::Null),
        Y::Bool(b) => Value::Scalar(Scalar::Bool(b)),
        Y::Number(n) => Value::Scalar(n.as_i64().map_or_else(
            || Scalar::Float(n.as_f64().unwrap_or_default()),
            Scalar::Integer,
        )),
        Y::String(s) => Value::string(s),
        Y::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(|item| from_yaml(path, item))
                .collect::<Result<_, _>>()?,
        ),
        Y::Mapping(entries) => {
            let mut map = Mapping::new();
            for (k, v) in entries {
                let key = match k {
                    Y::String(s) => s,
                    Y::Number(n) => n.to_string(),
                    Y::Bool(b) => b.to_string(),
                    other => {
                        return Err(LoadError::Shape {
                            path: path.to_path_buf(),
                            message: format!("mapping keys must be scalars, found {other:?}"),
                        });
                    }
                };
                map.insert(key, from_yaml(path, v)?);
            }
            Value::Mapping(map)
        }
        Y::Tagged(tagged) => {
            return Err(LoadError::Shape {
                path: path.to_path_buf(),
                message: format!("YAML tags are not supported ({})", tagged.tag),
            });
        }
    })
}

fn from_toml_table(table: toml::Table) -> Value {
    Value::Mapping(
        table
            .into_iter()
            .map(|(k, v)| (k, from_toml(v)))
            .collect(),
    )
}

fn from_toml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::string(s),
        toml::Value::Integer(i) => Value::Scalar(Scalar::Integer(i)),
        toml::Value::Float(x) => Value::Scalar(Scalar::Float(x)),
        toml::Value::Boolean(b) => Value::Scalar(Scalar::Bool(b)),
        toml::Value::Datetime(d) => Value::string(d.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(t) => from_toml_table(t),
    }
}

/// Map dotted key paths to the line declaring them, using the indentation
/// stack of block-style YAML.  Keys inside sequences, flow collections and
/// block scalars belong to their enclosing leaf and are not recorded.
fn locate_yaml_keys(text: &str) -> BTreeMap<String, usize> {
    let mut lines = BTreeMap::new();
    let mut stack: Vec<(usize, String)> = Vec::new();
    // Indent of the key that opened a `|` or `>` block still being read.
    let mut block_scalar: Option<usize> = None;
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start();
        let indent = raw.len() - trimmed.len();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(owner) = block_scalar {
            if indent > owner {
                continue;
            }
            block_scalar = None;
        }
        if trimmed.starts_with('#') || trimmed.starts_with("---") {
            continue;
        }
        if let Some(item) = trimmed.strip_prefix('-') {
            if yaml_key(item.trim_start()).is_some_and(|(_, v)| v.starts_with(['|', '>'])) {
                block_scalar = Some(indent);
            }
            continue;
        }
        let Some((key, value)) = yaml_key(trimmed) else {
            continue;
        };
        while stack.last().is_some_and(|(i, _)| *i >= indent) {
            stack.pop();
        }
        let parent = stack
            .iter()
            .map(|(_, k)| k.as_str())
            .collect::<Vec<_>>()
            .join(".");
        lines.entry(join_key(&parent, &key)).or_insert(idx + 1);
        if value.starts_with(['|', '>']) {
            block_scalar = Some(indent);
        }
        stack.push((indent, key));
    }
    lines
}

/// Split a `key: value` line into its key and trimmed value, honouring
/// quoted keys.
fn yaml_key(line: &str) -> Option<(String, &str)> {
    let (key, rest) = match line.chars().next()? {
        q @ ('"' | '\'') => {
            let body = line.strip_prefix(q)?;
            let (key, rest) = body.split_at(body.find(q)?);
            (key, rest.strip_prefix(q)?)
        }
        _ => {
            let (key, rest) = line.split_at(line.find(':')?);
            (key.trim_end(), rest)
        }
    };
    let rest = rest.strip_prefix(':')?;
    (rest.is_empty() || rest.starts_with([' ', '\t'])).then(|| (key.to_string(), rest.trim()))
}

/// Map dotted key paths to their declaring line using TOML table headers.
fn locate_toml_keys(text: &str) -> BTreeMap<String, usize> {
    let mut lines = BTreeMap::new();
    let mut table = Some(String::new());
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed.starts_with("[[") {
            // Arrays of tables are leaves of their parent key.
            table = None;
            continue;
        }
        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|h| h.split(']').next())
        {
            let name = header.trim().replace('"', "");
            lines.entry(name.clone()).or_insert(idx + 1);
            table = Some(name);
            continue;
        }
        if let (Some(current), Some(pos)) = (&table, trimmed.find('=')) {
            let key = trimmed
                .get(..pos)
                .unwrap_or_default()
                .trim()
                .trim_matches('"');
            lines.entry(join_key(current, key)).or_insert(idx + 1);
        }
    }
    lines
}
