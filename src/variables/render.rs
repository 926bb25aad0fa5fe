//! Fixed-point rendering of a merged variable tree.
//!
//! Values may reference other values, so a single pass is not enough:
//! `a: "{{ b }}"`, `b: "{{ c }}"`, `c: z` needs two.  Each pass renders
//! every still-templated leaf against a snapshot of the tree from the start
//! of the pass.  Rendering stops when no leaf contains template syntax.
use std::collections::HashSet;

use super::template::{TemplateRenderer, has_template_syntax};
use crate::config::Value;
use crate::error::TemplateError;

/// Maximum number of render passes before giving up.
pub const MAX_PASSES: usize = 10;

/// Render every template leaf of `tree` until a fixed point is reached.
///
/// Returns the number of passes performed (zero when the tree had no
/// templates).
///
/// # Errors
///
/// Returns [`TemplateError::Render`] if a leaf fails to render and
/// [`TemplateError::Unresolved`] if templates remain after a pass that made
/// no progress, after a previously seen state recurs, or after
/// [`MAX_PASSES`].
pub fn resolve_tree(renderer: &TemplateRenderer, tree: &mut Value) -> Result<usize, TemplateError> {
    let mut pending = templated_leaves(tree);
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut passes = 0;

    while !pending.is_empty() {
        if passes == MAX_PASSES {
            return Err(TemplateError::Unresolved {
                keys: pending,
                passes,
            });
        }
        passes += 1;

        let ctx = renderer.context(tree);
        let mut progressed = false;
        for key in &pending {
            let Some(leaf) = tree.lookup_mut(key) else {
                continue;
            };
            let before = leaf.clone();
            leaf.try_map_strings(&mut |s| {
                if has_template_syntax(s) {
                    renderer.render_with(key, s, &ctx)
                } else {
                    Ok(s.to_string())
                }
            })?;
            progressed |= *leaf != before;
        }

        pending.retain(|key| tree.lookup(key).is_some_and(contains_template));
        if pending.is_empty() {
            break;
        }

        let state = fingerprint(tree, &pending);
        if !progressed || !seen.insert(state) {
            return Err(TemplateError::Unresolved {
                keys: pending,
                passes,
            });
        }
    }

    Ok(passes)
}

/// Return `true` if any string inside `value` contains template syntax.
#[must_use]
pub fn contains_template(value: &Value) -> bool {
    match value {
        Value::Scalar(_) => value.as_str().is_some_and(has_template_syntax),
        Value::Sequence(items) => items.iter().any(contains_template),
        Value::Mapping(m) => m.values().any(contains_template),
    }
}

fn templated_leaves(tree: &Value) -> Vec<String> {
    let mut keys = Vec::new();
    tree.for_each_leaf("", &mut |key, leaf| {
        if contains_template(leaf) {
            keys.push(key);
        }
    });
    keys
}

fn fingerprint(tree: &Value, keys: &[String]) -> Vec<String> {
    keys.iter()
        .map(|k| {
            let leaf = tree.lookup(k).map(ToString::to_string).unwrap_or_default();
            format!("{k}={leaf}")
        })
        .collect()
}
