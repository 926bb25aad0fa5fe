//! Deep merge of variable sources.
//!
//! Mappings merge key by key.  Scalars and sequences replace whatever was
//! there.  A null is compatible with every kind; any other change of kind
//! (mapping to scalar, scalar to sequence, ...) is an error.
use std::path::Path;

use crate::config::{Mapping, Value, value::join_key};
use crate::error::VariableError;

/// Merge `incoming` into `tree`, returning the leaf keys whose value was
/// introduced or changed.
///
/// # Errors
///
/// Returns [`VariableError::Merge`] when a key changes kind incompatibly.
pub fn merge_into(
    tree: &mut Mapping,
    incoming: &Mapping,
    origin: &Path,
) -> Result<Vec<String>, VariableError> {
    let mut changed = Vec::new();
    merge_level(tree, incoming, origin, "", &mut changed)?;
    Ok(changed)
}

fn merge_level(
    tree: &mut Mapping,
    incoming: &Mapping,
    origin: &Path,
    prefix: &str,
    changed: &mut Vec<String>,
) -> Result<(), VariableError> {
    for (k, new) in incoming {
        let key = join_key(prefix, k);
        match (tree.get_mut(k), new) {
            (None, _) => {
                record_leaves(&key, new, changed);
                tree.insert(k.clone(), new.clone());
            }
            (Some(Value::Mapping(existing)), Value::Mapping(new_map)) => {
                merge_level(existing, new_map, origin, &key, changed)?;
            }
            (Some(existing), _) if compatible(existing, new) => {
                if existing != new {
                    record_leaves(&key, new, changed);
                    *existing = new.clone();
                }
            }
            (Some(existing), _) => {
                return Err(VariableError::Merge {
                    key,
                    origin: origin.to_path_buf(),
                    existing: existing.kind(),
                    incoming: new.kind(),
                });
            }
        }
    }
    Ok(())
}

fn compatible(existing: &Value, incoming: &Value) -> bool {
    existing.is_null()
        || incoming.is_null()
        || matches!(
            (existing, incoming),
            (Value::Scalar(_), Value::Scalar(_)) | (Value::Sequence(_), Value::Sequence(_))
        )
}

fn record_leaves(key: &str, value: &Value, changed: &mut Vec<String>) {
    match value {
        Value::Mapping(m) if m.is_empty() => changed.push(key.to_string()),
        Value::Mapping(_) => value.for_each_leaf(key, &mut |k, _| changed.push(k)),
        _ => changed.push(key.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::Scalar;
    use crate::config::loader::{Format, parse_tree};
    use std::path::PathBuf;

    fn yaml(text: &str) -> Mapping {
        match parse_tree(&PathBuf::from("t.yaml"), Format::Yaml, text).unwrap() {
            Value::Mapping(m) => m,
            other => panic!("not a mapping: {other:?}"),
        }
    }

    #[test]
    fn later_scalar_replaces_earlier() {
        let mut tree = yaml("editor: vim\n");
        let changed = merge_into(&mut tree, &yaml("editor: code\n"), Path::new("b.yaml")).unwrap();
        assert_eq!(tree.get("editor"), Some(&Value::string("code")));
        assert_eq!(changed, vec!["editor".to_string()]);
    }

    #[test]
    fn mappings_merge_recursively() {
        let mut tree = yaml("user:\n  name: ada\n  shell: bash\n");
        let changed = merge_into(
            &mut tree,
            &yaml("user:\n  shell: zsh\n  email: a@b.c\n"),
            Path::new("b.yaml"),
        )
        .unwrap();
        let user = Value::Mapping(tree);
        assert_eq!(user.lookup("user.name"), Some(&Value::string("ada")));
        assert_eq!(user.lookup("user.shell"), Some(&Value::string("zsh")));
        assert_eq!(user.lookup("user.email"), Some(&Value::string("a@b.c")));
        assert_eq!(changed, vec!["user.email".to_string(), "user.shell".to_string()]);
    }

    #[test]
    fn sequences_replace_wholesale() {
        let mut tree = yaml("pkgs: [git, vim]\n");
        merge_into(&mut tree, &yaml("pkgs: [zsh]\n"), Path::new("b.yaml")).unwrap();
        assert_eq!(
            tree.get("pkgs"),
            Some(&Value::Sequence(vec![Value::string("zsh")]))
        );
    }

    #[test]
    fn unchanged_value_is_not_reported() {
        let mut tree = yaml("editor: vim\n");
        let changed = merge_into(&mut tree, &yaml("editor: vim\n"), Path::new("b.yaml")).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn null_is_compatible_with_any_kind() {
        let mut tree = yaml("user: ~\n");
        merge_into(&mut tree, &yaml("user:\n  name: ada\n"), Path::new("b.yaml")).unwrap();
        assert!(matches!(tree.get("user"), Some(Value::Mapping(_))));

        merge_into(&mut tree, &yaml("user: ~\n"), Path::new("c.yaml")).unwrap();
        assert_eq!(tree.get("user"), Some(&Value::Scalar(Scalar::Null)));
    }

    #[test]
    fn mapping_to_scalar_is_error() {
        let mut tree = yaml("user:\n  name: ada\n");
        let err = merge_into(&mut tree, &yaml("user: ada\n"), Path::new("bad.yaml")).unwrap_err();
        match err {
            VariableError::Merge {
                key,
                origin,
                existing,
                incoming,
            } => {
                assert_eq!(key, "user");
                assert_eq!(origin, PathBuf::from("bad.yaml"));
                assert_eq!(existing, "mapping");
                assert_eq!(incoming, "scalar");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn scalar_to_sequence_is_error() {
        let mut tree = yaml("pkgs: git\n");
        assert!(merge_into(&mut tree, &yaml("pkgs: [git]\n"), Path::new("b.yaml")).is_err());
    }
}
