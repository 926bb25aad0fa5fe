//! Generic configuration value tree.
//!
//! Declaration files of every supported format are converted into [`Value`],
//! a closed tagged union, so that merge and render logic can pattern-match
//! exhaustively instead of juggling format-specific dynamic values.
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap as _, SerializeSeq as _};
use serde::{Serialize, Serializer};

/// Ordered mapping of string keys to values.
pub type Mapping = BTreeMap<String, Value>;

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit null (`~` in YAML).
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// String, possibly containing template expressions.
    String(String),
}

/// A node in a configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Leaf value.
    Scalar(Scalar),
    /// Ordered list; replaced wholesale on merge.
    Sequence(Vec<Self>),
    /// Nested mapping; merged key by key.
    Mapping(Mapping),
}

impl Value {
    /// Build a string scalar.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(s.into()))
    }

    /// Short name of this value's shape, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(Scalar::Null) => "null",
            Self::Scalar(_) => "scalar",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Return `true` for an explicit null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// Borrow the string content of a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries of a mapping.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a dot-separated key path.
    ///
    /// Returns `None` if any segment is missing or an intermediate node is
    /// not a mapping.  An empty path returns the value itself.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Self> {
        if key.is_empty() {
            return Some(self);
        }
        key.split('.')
            .try_fold(self, |node, segment| node.as_mapping()?.get(segment))
    }

    /// Mutable variant of [`lookup`](Self::lookup).
    pub fn lookup_mut(&mut self, key: &str) -> Option<&mut Self> {
        if key.is_empty() {
            return Some(self);
        }
        key.split('.').try_fold(self, |node, segment| match node {
            Self::Mapping(m) => m.get_mut(segment),
            _ => None,
        })
    }

    /// Visit every leaf (scalar or sequence) with its dotted key path.
    ///
    /// Empty mappings have no leaves.
    pub fn for_each_leaf<'a>(&'a self, prefix: &str, f: &mut impl FnMut(String, &'a Self)) {
        match self {
            Self::Mapping(m) => {
                for (k, v) in m {
                    v.for_each_leaf(&join_key(prefix, k), &mut *f);
                }
            }
            leaf => f(prefix.to_string(), leaf),
        }
    }

    /// Visit every string inside this value, including sequence elements,
    /// allowing it to be replaced in place.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error produced by `f`.
    pub fn try_map_strings<E>(
        &mut self,
        f: &mut impl FnMut(&str) -> Result<String, E>,
    ) -> Result<(), E> {
        match self {
            Self::Scalar(Scalar::String(s)) => {
                *s = f(s.as_str())?;
                Ok(())
            }
            Self::Scalar(_) => Ok(()),
            Self::Sequence(items) => items
                .iter_mut()
                .try_for_each(|v| v.try_map_strings(&mut *f)),
            Self::Mapping(m) => m
                .values_mut()
                .try_for_each(|v| v.try_map_strings(&mut *f)),
        }
    }
}

/// Join a key prefix and a segment with a dot.
#[must_use]
pub fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Mapping(Mapping::new())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => s.fmt(f),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(Scalar::Null) => serializer.serialize_unit(),
            Self::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Self::Scalar(Scalar::Integer(i)) => serializer.serialize_i64(*i),
            Self::Scalar(Scalar::Float(x)) => serializer.serialize_f64(*x),
            Self::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Scalar(Scalar::Null) => Self::Null,
            Value::Scalar(Scalar::Bool(b)) => Self::Bool(*b),
            Value::Scalar(Scalar::Integer(i)) => Self::from(*i),
            Value::Scalar(Scalar::Float(x)) => {
                serde_json::Number::from_f64(*x).map_or(Self::Null, Self::Number)
            }
            Value::Scalar(Scalar::String(s)) => Self::String(s.clone()),
            Value::Sequence(items) => Self::Array(items.iter().map(Self::from).collect()),
            Value::Mapping(m) => Self::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}
