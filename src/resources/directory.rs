//! Directory resource.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState, current_mode, set_mode};

/// A directory that should exist, optionally with specific permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryResource {
    /// Directory path.
    pub path: PathBuf,
    /// Desired permission bits (unix only).
    pub mode: Option<u32>,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(path: PathBuf, mode: Option<u32>) -> Self {
        Self { path, mode }
    }
}

impl Resource for DirectoryResource {
    fn description(&self) -> String {
        self.mode.map_or_else(
            || format!("directory {}", self.path.display()),
            |m| format!("directory {} (mode {m:04o})", self.path.display()),
        )
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Ok(meta) = std::fs::metadata(&self.path) else {
            return Ok(ResourceState::Missing);
        };
        if !meta.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} exists and is not a directory", self.path.display()),
            });
        }
        if let Some(want) = self.mode
            && let Some(have) = current_mode(&self.path)
            && have != want
        {
            return Ok(ResourceState::Incorrect {
                current: format!("mode {have:04o}"),
            });
        }
        Ok(ResourceState::Correct)
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.current_state()? == ResourceState::Correct {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        if !self.path.is_dir() {
            std::fs::create_dir_all(&self.path)
                .with_context(|| format!("create directory: {}", self.path.display()))?;
        }
        if let Some(mode) = self.mode {
            set_mode(&self.path, mode)?;
        }
        Ok(ResourceChange::Applied)
    }
}
