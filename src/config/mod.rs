//! Declaration file loading.
//!
//! A configuration repository has two trees, each rooted at an index file:
//!
//! ```text
//! <root>/
//! ├── variables/index.{yaml,yml,toml}   optional
//! └── jobs/index.{yaml,yml,toml}        required for apply/plan
//! ```
pub mod loader;
pub mod value;

pub use loader::{Format, LoadedFile, find_index, load_file, load_sections, load_tree, locate_keys};
pub use value::{Mapping, Scalar, Value};

/// Directory holding variable declarations, relative to the repository root.
pub const VARIABLES_DIR: &str = "variables";

/// Directory holding job declarations, relative to the repository root.
pub const JOBS_DIR: &str = "jobs";
