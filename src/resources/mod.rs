//! Idempotent resource primitives (check + apply pattern).
//!
//! Modules translate task parameters into resources; resources know how to
//! read the live state of one filesystem entry or package and how to bring
//! it to the desired state.
pub mod directory;
pub mod file;
pub mod helpers;
pub mod package;
pub mod symlink;

use anyhow::Result;

/// What planning found at a resource's location.
///
/// ```
/// use dotstate_cli::resources::ResourceState;
///
/// let drift = ResourceState::Incorrect { current: "mode 0644".into() };
/// assert_ne!(drift, ResourceState::Correct);
/// assert_eq!(ResourceState::Missing, ResourceState::Missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing there yet.
    Missing,
    /// Already as declared.
    Correct,
    /// Present, but differs from the declaration.
    Incorrect {
        /// Short description of what is there now.
        current: String,
    },
    /// Something is in the way that apply must not touch.
    Invalid {
        /// Why the declaration cannot be satisfied.
        reason: String,
    },
}

/// What [`Resource::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// The entry was created or changed.
    Applied,
    /// Nothing needed doing.
    AlreadyCorrect,
}

/// A single filesystem entry or package with a declared state.
///
/// Modules call [`current_state`](Self::current_state) while planning and
/// [`apply`](Self::apply) only when the plan is not skipped.
pub trait Resource {
    /// One-line summary used in plans and logs.
    fn description(&self) -> String;

    /// Inspect the live system.
    ///
    /// # Errors
    ///
    /// Fails when the entry cannot be read, e.g. permission denied or a
    /// package query that cannot run.
    fn current_state(&self) -> Result<ResourceState>;

    /// Make the live system match.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a failing install command.
    fn apply(&self) -> Result<ResourceChange>;
}

/// Parse an octal permission string such as `"0755"` or `"644"`.
///
/// # Errors
///
/// Returns an error if the string is not a valid octal number up to `0o7777`.
pub fn parse_mode(mode: &str) -> Result<u32> {
    let digits = mode.trim().trim_start_matches("0o");
    let value = u32::from_str_radix(digits, 8)
        .map_err(|_| anyhow::anyhow!("invalid mode '{mode}': expected an octal string like \"0644\""))?;
    if value > 0o7777 {
        anyhow::bail!("invalid mode '{mode}': out of range");
    }
    Ok(value)
}

/// Read the permission bits of `path` (unix only; `None` elsewhere).
#[must_use]
pub fn current_mode(path: &std::path::Path) -> Option<u32> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::metadata(path)
            .ok()
            .map(|m| m.permissions().mode() & 0o7777)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        None
    }
}

/// Set the permission bits of `path` (no-op on non-unix platforms).
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
pub fn set_mode(path: &std::path::Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use anyhow::Context as _;
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("chmod {mode:04o} {}", path.display()))?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
    Ok(())
}
