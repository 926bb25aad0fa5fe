//! Platform descriptor: operating system, architecture, shell and hostname.
use std::fmt;
use std::str::FromStr;

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux distributions.
    Linux,
    /// macOS.
    Macos,
    /// Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "darwin"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "darwin" | "macos" | "osx" => Ok(Self::Macos),
            "windows" | "win" => Ok(Self::Windows),
            other => Err(format!(
                "unknown platform '{other}': expected linux, darwin or windows"
            )),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture as reported by the Rust target (`x86_64`, `aarch64`).
    pub arch: String,
    /// Login shell name (`bash`, `zsh`, `powershell`).
    pub shell: String,
    /// Host name of the machine.
    pub hostname: String,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            os: Self::detect_os(),
            arch: std::env::consts::ARCH.to_string(),
            shell: Self::detect_shell(),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub fn new(os: Os, shell: &str, hostname: &str) -> Self {
        Self {
            os,
            arch: std::env::consts::ARCH.to_string(),
            shell: shell.to_string(),
            hostname: hostname.to_string(),
        }
    }

    /// Return `true` on Linux.
    #[must_use]
    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    /// Return `true` on Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    fn detect_os() -> Os {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::Macos
        } else {
            // Default to Linux for other Unix-like systems
            Os::Linux
        }
    }

    fn detect_shell() -> String {
        std::env::var("SHELL").map_or_else(
            |_| {
                if cfg!(target_os = "windows") {
                    "powershell".to_string()
                } else {
                    "sh".to_string()
                }
            },
            |shell| {
                std::path::Path::new(&shell)
                    .file_name()
                    .map_or(shell.clone(), |n| n.to_string_lossy().into_owned())
            },
        )
    }
}
