//! Command: print version information.
use std::io::Write;

use anyhow::Result;

/// Version string baked in by `build.rs`, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("DOTSTATE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Write `dotstate <version>` to `out`.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub fn run(out: &mut impl Write) -> Result<()> {
    writeln!(out, "dotstate {}", version())?;
    Ok(())
}
