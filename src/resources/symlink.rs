//! Symbolic link resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, is_real_dir};
use super::{Resource, ResourceChange, ResourceState};

/// A link at `target` that must resolve to `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkResource {
    /// What the link points at (inside the repository).
    pub source: PathBuf,
    /// Where the link lives.
    pub target: PathBuf,
}

/// What currently occupies the target path.
enum Occupant {
    Nothing,
    Link(PathBuf),
    Directory,
    Other,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }

    fn occupant(&self) -> Occupant {
        if let Ok(dest) = std::fs::read_link(&self.target) {
            return Occupant::Link(dest);
        }
        if is_real_dir(&self.target) {
            Occupant::Directory
        } else if self.target.symlink_metadata().is_ok() {
            Occupant::Other
        } else {
            Occupant::Nothing
        }
    }
}

impl Resource for SymlinkResource {
    fn description(&self) -> String {
        format!("link {} -> {}", self.target.display(), self.source.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }
        Ok(match self.occupant() {
            Occupant::Nothing => ResourceState::Missing,
            Occupant::Link(dest) if same_path(&dest, &self.source) => ResourceState::Correct,
            Occupant::Link(dest) => ResourceState::Incorrect {
                current: format!("links to {}", dest.display()),
            },
            Occupant::Directory => ResourceState::Invalid {
                reason: format!("target is a real directory: {}", self.target.display()),
            },
            Occupant::Other => ResourceState::Incorrect {
                current: "a regular file".to_string(),
            },
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.target)?;
        match self.occupant() {
            Occupant::Directory => anyhow::bail!(
                "refusing to replace directory {}",
                self.target.display()
            ),
            Occupant::Nothing => {}
            Occupant::Link(_) | Occupant::Other => remove_entry(&self.target)?,
        }
        link(&self.source, &self.target)?;
        Ok(ResourceChange::Applied)
    }
}

/// Path equality that ignores the `\\?\` verbatim prefix Windows APIs add.
fn same_path(a: &Path, b: &Path) -> bool {
    #[cfg(windows)]
    {
        let strip = |p: &Path| {
            let s = p.to_string_lossy().into_owned();
            s.strip_prefix(r"\\?\").map_or_else(|| s.clone(), str::to_string)
        };
        strip(a) == strip(b)
    }
    #[cfg(not(windows))]
    {
        a == b
    }
}

#[cfg(unix)]
fn link(source: &Path, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(source, target)
        .with_context(|| format!("symlink {} -> {}", target.display(), source.display()))
}

#[cfg(windows)]
fn link(source: &Path, target: &Path) -> Result<()> {
    let made = if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    };
    made.with_context(|| {
        format!(
            "symlink {} -> {} (requires Developer Mode or an elevated shell)",
            target.display(),
            source.display()
        )
    })
}

/// Remove a file or link; directory links on Windows need `remove_dir`.
fn remove_entry(path: &Path) -> Result<()> {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt as _;
        const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
        let meta = std::fs::symlink_metadata(path)
            .with_context(|| format!("stat {}", path.display()))?;
        if meta.file_attributes() & FILE_ATTRIBUTE_DIRECTORY != 0 {
            return std::fs::remove_dir(path)
                .with_context(|| format!("remove {}", path.display()));
        }
    }
    std::fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn with_source() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("zshrc");
        std::fs::write(&source, "export EDITOR=nvim\n").unwrap();
        let target = dir.path().join("home/.zshrc");
        (dir, source, target)
    }

    #[test]
    fn description_names_both_ends() {
        let r = SymlinkResource::new(PathBuf::from("/repo/zshrc"), PathBuf::from("/home/.zshrc"));
        assert_eq!(r.description(), "link /home/.zshrc -> /repo/zshrc");
    }

    #[test]
    fn missing_source_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let r = SymlinkResource::new(dir.path().join("nope"), dir.path().join("t"));
        assert!(matches!(
            r.current_state().unwrap(),
            ResourceState::Invalid { ref reason } if reason.contains("source does not exist")
        ));
    }

    #[test]
    fn real_directory_target_is_invalid_and_never_removed() {
        let (_dir, source, target) = with_source();
        std::fs::create_dir_all(&target).unwrap();
        let r = SymlinkResource::new(source, target.clone());
        assert!(matches!(r.current_state().unwrap(), ResourceState::Invalid { .. }));
        assert!(r.apply().is_err());
        assert!(target.is_dir());
    }

    #[test]
    fn absent_target_is_missing() {
        let (_dir, source, target) = with_source();
        let r = SymlinkResource::new(source, target);
        assert_eq!(r.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn regular_file_target_is_incorrect() {
        let (_dir, source, target) = with_source();
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, "old").unwrap();
        let r = SymlinkResource::new(source, target);
        assert_eq!(
            r.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "a regular file".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn apply_creates_parents_then_is_correct() {
        let (_dir, source, target) = with_source();
        let r = SymlinkResource::new(source.clone(), target.clone());
        assert_eq!(r.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
        assert_eq!(r.current_state().unwrap(), ResourceState::Correct);
    }

    #[cfg(unix)]
    #[test]
    fn apply_repoints_a_stale_link() {
        let (dir, source, target) = with_source();
        let stale = dir.path().join("stale");
        std::fs::write(&stale, "x").unwrap();
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(&stale, &target).unwrap();

        let r = SymlinkResource::new(source.clone(), target.clone());
        assert!(matches!(
            r.current_state().unwrap(),
            ResourceState::Incorrect { ref current } if current.starts_with("links to")
        ));
        r.apply().unwrap();
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
        assert!(stale.exists(), "old link destination must be left alone");
    }

    #[cfg(unix)]
    #[test]
    fn apply_replaces_regular_file() {
        let (_dir, source, target) = with_source();
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, "old").unwrap();
        let r = SymlinkResource::new(source.clone(), target.clone());
        r.apply().unwrap();
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
    }
}
