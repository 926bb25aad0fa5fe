//! Regular file resource with exact content.
use anyhow::Result;
use std::path::PathBuf;

use super::helpers::fs::atomic_write;
use super::{Resource, ResourceChange, ResourceState, current_mode, set_mode};

/// A regular file that should hold exactly `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResource {
    /// File path.
    pub path: PathBuf,
    /// Desired file content.
    pub content: Vec<u8>,
    /// Desired permission bits (unix only).
    pub mode: Option<u32>,
}

impl FileResource {
    /// Create a new file resource.
    #[must_use]
    pub const fn new(path: PathBuf, content: Vec<u8>, mode: Option<u32>) -> Self {
        Self {
            path,
            content,
            mode,
        }
    }

    fn mode_mismatch(&self) -> Option<u32> {
        let want = self.mode?;
        current_mode(&self.path).filter(|have| *have != want)
    }
}

impl Resource for FileResource {
    fn description(&self) -> String {
        format!("file {} ({} bytes)", self.path.display(), self.content.len())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Ok(meta) = std::fs::metadata(&self.path) else {
            return Ok(ResourceState::Missing);
        };
        if meta.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a directory", self.path.display()),
            });
        }
        let existing = std::fs::read(&self.path)?;
        if existing != self.content {
            return Ok(ResourceState::Incorrect {
                current: format!("content differs ({} bytes on disk)", existing.len()),
            });
        }
        if let Some(have) = self.mode_mismatch() {
            return Ok(ResourceState::Incorrect {
                current: format!("mode {have:04o}"),
            });
        }
        Ok(ResourceState::Correct)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let same_content = std::fs::read(&self.path).is_ok_and(|c| c == self.content);
        let mode_mismatch = self.mode_mismatch().is_some();
        if same_content && !mode_mismatch {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        if !same_content {
            atomic_write(&self.path, &self.content)?;
        }
        if let Some(mode) = self.mode {
            set_mode(&self.path, mode)?;
        }
        Ok(ResourceChange::Applied)
    }
}
