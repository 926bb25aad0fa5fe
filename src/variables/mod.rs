//! Variable resolution engine.
//!
//! Loads `variables/index.*`, follows its imports (conditionally, in order),
//! deep-merges every source into one tree, renders templates to a fixed
//! point and records which source set each key.
//!
//! # Example
//!
//! ```no_run
//! use dotstate_cli::variables::{VariableResolver, options::{Ambient, ResolutionOptions}};
//!
//! let ambient = Ambient::detect(&ResolutionOptions::default());
//! let mut resolver = VariableResolver::new(std::path::Path::new("."), &ambient);
//! let tree = resolver.load_all()?;
//! println!("{:?}", tree.get("editor"));
//! # Ok::<(), dotstate_cli::error::VariableError>(())
//! ```
pub mod index;
pub mod merge;
pub mod options;
pub mod render;
pub mod template;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, LoadedFile, Mapping, Value, find_index, load_file};
use crate::error::{LoadError, VariableError};
use index::VariableIndex;
use options::Ambient;
use template::{TemplateRenderer, has_template_syntax};

/// One leaf declared by a source, before and after resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableEntry {
    /// Dotted key path.
    pub key: String,
    /// Value as written in the file.
    pub raw: Value,
    /// Value rendered against the final tree, if it renders cleanly.
    pub resolved: Option<Value>,
    /// Line in the source file, when known.
    pub line: Option<usize>,
}

/// A file that contributed variables to the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSource {
    /// File the variables came from.
    pub origin: PathBuf,
    /// Zero-based position in load order.
    pub layer: usize,
    /// Declared leaves in key order.
    pub entries: Vec<VariableEntry>,
}

/// One step in the history of a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Source file.
    pub origin: PathBuf,
    /// Load-order layer of the source.
    pub layer: usize,
    /// The entry that source declared.
    #[serde(flatten)]
    pub entry: VariableEntry,
}

/// The fully merged and rendered variable tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariableTree(Value);

impl VariableTree {
    /// Wrap an already resolved value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a dotted key path.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        get_variable(key, self)
    }

    /// Borrow the underlying value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Look up a dotted key path in a resolved tree.
///
/// `get_variable("user.name", tree)` returns the `name` entry of the `user`
/// mapping.  Missing segments and lookups through non-mappings return `None`.
#[must_use]
pub fn get_variable<'a>(key: &str, tree: &'a VariableTree) -> Option<&'a Value> {
    if key.is_empty() {
        return None;
    }
    tree.0.lookup(key)
}

/// Loads and resolves the variables of one repository.
#[derive(Debug)]
pub struct VariableResolver {
    dir: PathBuf,
    renderer: TemplateRenderer,
    sources: Vec<VariableSource>,
    /// Parsed mapping of each source, parallel to `sources`.
    trees: Vec<Mapping>,
    provenance: BTreeMap<String, Vec<(usize, usize)>>,
}

impl VariableResolver {
    /// Create a resolver for the repository rooted at `base`.
    #[must_use]
    pub fn new(base: &Path, ambient: &Ambient) -> Self {
        Self {
            dir: base.join(config::VARIABLES_DIR),
            renderer: TemplateRenderer::new(ambient),
            sources: Vec::new(),
            trees: Vec::new(),
            provenance: BTreeMap::new(),
        }
    }

    /// Load, merge and render every variable source.
    ///
    /// A repository without a `variables/` index resolves to an empty tree.
    /// Calling this again reloads from disk and replaces previous results.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError`] on unreadable or malformed files, import
    /// cycles, incompatible merges and render failures.
    pub fn load_all(&mut self) -> Result<VariableTree, VariableError> {
        self.sources.clear();
        self.trees.clear();
        self.provenance.clear();

        match find_index(&self.dir) {
            Some(index) => {
                let mut visiting = Vec::new();
                self.load_index(&index, &mut visiting)?;
            }
            None => {
                tracing::debug!(dir = %self.dir.display(), "no variable index, using empty tree");
            }
        }

        let mut merged = Mapping::new();
        for (source_idx, (source, incoming)) in self.sources.iter().zip(&self.trees).enumerate() {
            let changed = merge::merge_into(&mut merged, incoming, &source.origin)?;
            let positions: HashMap<&str, usize> = source
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.key.as_str(), i))
                .collect();
            for key in changed {
                if let Some(&entry_idx) = positions.get(key.as_str()) {
                    self.provenance
                        .entry(key)
                        .or_default()
                        .push((source_idx, entry_idx));
                }
            }
        }

        let mut tree = Value::Mapping(merged);
        let passes = render::resolve_tree(&self.renderer, &mut tree)?;
        tracing::debug!(
            sources = self.sources.len(),
            passes,
            "resolved variable tree"
        );

        self.resolve_entries(&tree);
        Ok(VariableTree(tree))
    }

    /// Sources in load order from the last [`load_all`](Self::load_all).
    #[must_use]
    pub fn sources(&self) -> &[VariableSource] {
        &self.sources
    }

    /// Every source entry that set `key` or one of its descendants, in load
    /// order.  Keys that were never set (or only set by skipped imports)
    /// return an empty list.
    #[must_use]
    pub fn trace(&self, key: &str) -> Vec<TraceEntry> {
        let prefix = format!("{key}.");
        let mut hits: Vec<(usize, usize)> = self
            .provenance
            .iter()
            .filter(|(k, _)| k.as_str() == key || k.starts_with(&prefix))
            .flat_map(|(_, positions)| positions.iter().copied())
            .collect();
        hits.sort_unstable();
        hits.into_iter()
            .filter_map(|(s, e)| {
                let source = self.sources.get(s)?;
                Some(TraceEntry {
                    origin: source.origin.clone(),
                    layer: source.layer,
                    entry: source.entries.get(e)?.clone(),
                })
            })
            .collect()
    }

    /// Renderer configured with this resolver's ambient context.
    #[must_use]
    pub const fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Consume the resolver, keeping only its renderer.
    #[must_use]
    pub fn into_renderer(self) -> TemplateRenderer {
        self.renderer
    }

    fn load_index(&mut self, path: &Path, visiting: &mut Vec<PathBuf>) -> Result<(), VariableError> {
        let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if visiting.contains(&canonical) {
            return Err(LoadError::ImportCycle {
                path: path.to_path_buf(),
            }
            .into());
        }
        visiting.push(canonical);

        let file = load_file(path)?;
        let index = VariableIndex::from_file(&file)?;
        if !index.variables.is_empty() {
            self.push_source(path, index.variables.clone(), &index.lines);
        }

        let base = VariableIndex::base_dir(path);
        let empty = Value::default();
        for import in &index.imports {
            let location = format!("import '{}' in {}", import.path, path.display());
            if let Some(condition) = &import.condition
                && !self.renderer.eval_condition(&location, condition, &empty)?
            {
                tracing::debug!(import = %import.path, "import condition is false, skipping");
                continue;
            }

            let rendered = if has_template_syntax(&import.path) {
                self.renderer.render(&location, &import.path, &empty)?
            } else {
                import.path.clone()
            };
            let target = base.join(rendered);

            if target.is_dir() {
                let nested = find_index(&target).ok_or(LoadError::MissingIndex { dir: target })?;
                self.load_index(&nested, visiting)?;
            } else {
                self.load_variables_file(&target)?;
            }
        }

        visiting.pop();
        Ok(())
    }

    fn load_variables_file(&mut self, path: &Path) -> Result<(), VariableError> {
        let LoadedFile { tree, lines, .. } = load_file(path)?;
        let Value::Mapping(mapping) = tree else {
            return Err(LoadError::Shape {
                path: path.to_path_buf(),
                message: format!("variables file must be a mapping, found {}", tree.kind()),
            }
            .into());
        };
        self.push_source(path, mapping, &lines);
        Ok(())
    }

    fn push_source(&mut self, origin: &Path, mapping: Mapping, lines: &BTreeMap<String, usize>) {
        let mut entries = Vec::new();
        for (name, value) in &mapping {
            value.for_each_leaf(name, &mut |key, raw| {
                entries.push(VariableEntry {
                    line: lines.get(&key).copied(),
                    key,
                    raw: raw.clone(),
                    resolved: None,
                });
            });
        }
        tracing::debug!(origin = %origin.display(), keys = entries.len(), "loaded variable source");
        self.sources.push(VariableSource {
            origin: origin.to_path_buf(),
            layer: self.sources.len(),
            entries,
        });
        self.trees.push(mapping);
    }

    fn resolve_entries(&mut self, tree: &Value) {
        let ctx = self.renderer.context(tree);
        let renderer = &self.renderer;
        for entry in self.sources.iter_mut().flat_map(|s| s.entries.iter_mut()) {
            let mut value = entry.raw.clone();
            let rendered = value.try_map_strings(&mut |s| {
                if has_template_syntax(s) {
                    renderer.render_with(&entry.key, s, &ctx)
                } else {
                    Ok(s.to_string())
                }
            });
            entry.resolved = match rendered {
                Ok(()) if !render::contains_template(&value) => Some(value),
                _ => None,
            };
        }
    }
}
