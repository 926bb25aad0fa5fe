//! Resolution options and the ambient template context derived from them.
use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::platform::{Os, Platform};

/// Runtime overrides supplied by the CLI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionOptions {
    /// Platform name override (`linux`, `darwin`, `windows`).
    pub platform: Option<String>,
    /// Shell name override.
    pub shell: Option<String>,
    /// Hostname override.
    pub hostname: Option<String>,
    /// Environment variables layered on top of the process environment.
    pub environment: BTreeMap<String, String>,
}

/// Parse `KEY=VALUE` pairs, splitting on the first `=`.
///
/// When a key is repeated the first occurrence wins.
///
/// # Errors
///
/// Returns an error if a pair has no `=` or an empty key.
pub fn parse_env_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("invalid environment override '{pair}': expected KEY=VALUE");
        };
        if key.is_empty() {
            anyhow::bail!("invalid environment override '{pair}': empty key");
        }
        env.entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    Ok(env)
}

/// `Platform` object exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    /// Operating system name.
    #[serde(rename = "OS")]
    pub os: String,
    /// CPU architecture.
    #[serde(rename = "Arch")]
    pub arch: String,
    /// Shell name.
    #[serde(rename = "Shell")]
    pub shell: String,
    /// Host name.
    #[serde(rename = "Hostname")]
    pub hostname: String,
}

/// `User` object exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    /// Login name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Home directory.
    #[serde(rename = "Home")]
    pub home: String,
}

/// Values available to every template regardless of the variable tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ambient {
    /// Platform descriptor after overrides.
    #[serde(rename = "Platform")]
    pub platform: PlatformInfo,
    /// Process environment with overrides applied on top.
    #[serde(rename = "Env")]
    pub env: BTreeMap<String, String>,
    /// Current user.
    #[serde(rename = "User")]
    pub user: UserInfo,
}

impl Ambient {
    /// Build the ambient context from a detected platform, the process
    /// environment and the CLI overrides.
    #[must_use]
    pub fn new(
        detected: &Platform,
        process_env: impl IntoIterator<Item = (String, String)>,
        options: &ResolutionOptions,
    ) -> Self {
        let mut env: BTreeMap<String, String> = process_env.into_iter().collect();
        env.extend(
            options
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let os = options.platform.as_deref().map_or_else(
            || detected.os.to_string(),
            |p| {
                p.parse::<Os>()
                    .map_or_else(|_| p.to_ascii_lowercase(), |os| os.to_string())
            },
        );

        let lookup = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| env.get(*k).cloned())
                .unwrap_or_default()
        };
        let user = UserInfo {
            name: lookup(&["USER", "USERNAME", "LOGNAME"]),
            home: lookup(&["HOME", "USERPROFILE"]),
        };

        Self {
            platform: PlatformInfo {
                os,
                arch: detected.arch.clone(),
                shell: options
                    .shell
                    .clone()
                    .unwrap_or_else(|| detected.shell.clone()),
                hostname: options
                    .hostname
                    .clone()
                    .unwrap_or_else(|| detected.hostname.clone()),
            },
            env,
            user,
        }
    }

    /// Detect the platform and read the process environment.
    #[must_use]
    pub fn detect(options: &ResolutionOptions) -> Self {
        Self::new(&Platform::detect(), std::env::vars(), options)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform::new(Os::Linux, "bash", "devbox")
    }

    #[test]
    fn env_pairs_split_on_first_equals() {
        let env = parse_env_pairs(&["A=1", "B=x=y"]).unwrap();
        assert_eq!(env.get("A").map(String::as_str), Some("1"));
        assert_eq!(env.get("B").map(String::as_str), Some("x=y"));
    }

    #[test]
    fn env_pairs_first_occurrence_wins() {
        let env = parse_env_pairs(&["A=first", "A=second"]).unwrap();
        assert_eq!(env.get("A").map(String::as_str), Some("first"));
    }

    #[test]
    fn env_pairs_reject_missing_equals() {
        let err = parse_env_pairs(&["NOPE"]).unwrap_err();
        assert!(err.to_string().contains("KEY=VALUE"));
    }

    #[test]
    fn env_pairs_reject_empty_key() {
        assert!(parse_env_pairs(&["=value"]).is_err());
    }

    #[test]
    fn overrides_replace_detected_values() {
        let options = ResolutionOptions {
            platform: Some("Windows".to_string()),
            shell: Some("pwsh".to_string()),
            hostname: Some("work".to_string()),
            environment: BTreeMap::new(),
        };
        let ambient = Ambient::new(&linux(), Vec::new(), &options);
        assert_eq!(ambient.platform.os, "windows");
        assert_eq!(ambient.platform.shell, "pwsh");
        assert_eq!(ambient.platform.hostname, "work");
    }

    #[test]
    fn unknown_platform_override_is_kept_verbatim() {
        let options = ResolutionOptions {
            platform: Some("FreeBSD".to_string()),
            ..ResolutionOptions::default()
        };
        let ambient = Ambient::new(&linux(), Vec::new(), &options);
        assert_eq!(ambient.platform.os, "freebsd");
    }

    #[test]
    fn env_overrides_take_precedence_and_feed_user() {
        let mut environment = BTreeMap::new();
        environment.insert("HOME".to_string(), "/override".to_string());
        let options = ResolutionOptions {
            environment,
            ..ResolutionOptions::default()
        };
        let process = vec![
            ("HOME".to_string(), "/home/real".to_string()),
            ("USER".to_string(), "ada".to_string()),
        ];
        let ambient = Ambient::new(&linux(), process, &options);
        assert_eq!(ambient.env.get("HOME").map(String::as_str), Some("/override"));
        assert_eq!(ambient.user.home, "/override");
        assert_eq!(ambient.user.name, "ada");
    }

    #[test]
    fn serializes_with_template_names() {
        let ambient = Ambient::new(&linux(), Vec::new(), &ResolutionOptions::default());
        let json = serde_json::to_value(&ambient).unwrap();
        assert_eq!(json["Platform"]["OS"], "linux");
        assert_eq!(json["Platform"]["Hostname"], "devbox");
    }
}
