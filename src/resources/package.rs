//! Package installation resource.
use std::fmt;
use std::str::FromStr;

use anyhow::Result;

use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Arch Linux packages (pacman).
    Pacman,
    /// AUR packages (paru).
    Paru,
    /// Debian/Ubuntu packages (apt).
    Apt,
    /// Fedora packages (dnf).
    Dnf,
    /// Homebrew formulae.
    Brew,
    /// Windows packages (winget).
    Winget,
}

impl PackageManager {
    /// Every supported manager, in auto-detection order.
    pub const ALL: [Self; 6] = [
        Self::Pacman,
        Self::Apt,
        Self::Dnf,
        Self::Brew,
        Self::Winget,
        Self::Paru,
    ];

    /// Program whose presence on `PATH` indicates this manager is usable.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Pacman => "pacman",
            Self::Paru => "paru",
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Brew => "brew",
            Self::Winget => "winget",
        }
    }

    /// Pick the first manager available through `executor`.
    #[must_use]
    pub fn detect(executor: &dyn Executor) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| executor.which(m.program()))
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pacman => write!(f, "pacman"),
            Self::Paru => write!(f, "paru"),
            Self::Apt => write!(f, "apt"),
            Self::Dnf => write!(f, "dnf"),
            Self::Brew => write!(f, "brew"),
            Self::Winget => write!(f, "winget"),
        }
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pacman" => Ok(Self::Pacman),
            "paru" => Ok(Self::Paru),
            "apt" | "apt-get" => Ok(Self::Apt),
            "dnf" => Ok(Self::Dnf),
            "brew" | "homebrew" => Ok(Self::Brew),
            "winget" => Ok(Self::Winget),
            other => Err(format!(
                "unknown package manager '{other}': expected pacman, paru, apt, dnf, brew or winget"
            )),
        }
    }
}

/// A system package resource that can be checked and installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name (or winget ID).
    pub name: String,
    /// Package manager to use.
    pub manager: PackageManager,
    /// Executor for running package manager commands.
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, manager: PackageManager, executor: &'a dyn Executor) -> Self {
        Self {
            name,
            manager,
            executor,
        }
    }

    /// Command line (program, arguments) that installs this package.
    #[must_use]
    pub fn install_command(&self) -> (&'static str, Vec<&str>) {
        let name = self.name.as_str();
        match self.manager {
            PackageManager::Pacman => ("sudo", vec!["pacman", "-S", "--needed", "--noconfirm", name]),
            PackageManager::Paru => ("paru", vec!["-S", "--needed", "--noconfirm", name]),
            PackageManager::Apt => ("sudo", vec!["apt-get", "install", "-y", name]),
            PackageManager::Dnf => ("sudo", vec!["dnf", "install", "-y", name]),
            PackageManager::Brew => ("brew", vec!["install", name]),
            PackageManager::Winget => (
                "winget",
                vec![
                    "install",
                    "--id",
                    name,
                    "--exact",
                    "--source",
                    "winget",
                    "--accept-source-agreements",
                    "--accept-package-agreements",
                ],
            ),
        }
    }

    fn query_command(&self) -> (&'static str, Vec<&str>) {
        let name = self.name.as_str();
        match self.manager {
            PackageManager::Pacman | PackageManager::Paru => ("pacman", vec!["-Q", name]),
            PackageManager::Apt => ("dpkg", vec!["-s", name]),
            PackageManager::Dnf => ("rpm", vec!["-q", name]),
            PackageManager::Brew => ("brew", vec!["list", "--versions", name]),
            PackageManager::Winget => (
                "winget",
                vec!["list", "--id", name, "--exact", "--accept-source-agreements"],
            ),
        }
    }
}

impl Resource for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.manager)
    }

    fn current_state(&self) -> Result<ResourceState> {
        let (program, args) = self.query_command();
        let result = self.executor.run_unchecked(program, &args)?;
        let installed = match self.manager {
            PackageManager::Apt => {
                result.success && result.stdout.contains("Status: install ok installed")
            }
            // `brew list --versions` exits zero with empty output for unknown formulae.
            PackageManager::Brew => result.success && !result.stdout.trim().is_empty(),
            PackageManager::Winget => result.success && result.stdout.contains(&self.name),
            PackageManager::Pacman | PackageManager::Paru | PackageManager::Dnf => result.success,
        };
        Ok(if installed {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        let (program, args) = self.install_command();
        if self.manager == PackageManager::Winget {
            let result = self.executor.run_unchecked(program, &args)?;
            if !result.success {
                // winget writes most diagnostics to stdout, not stderr.
                let detail = if result.stderr.trim().is_empty() {
                    result.stdout.trim().to_string()
                } else {
                    format!("{}\n{}", result.stdout.trim(), result.stderr.trim())
                };
                anyhow::bail!("winget install failed for '{}': {detail}", self.name);
            }
        } else {
            self.executor.run(program, &args)?;
        }
        Ok(ResourceChange::Applied)
    }
}
