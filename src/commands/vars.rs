//! Command: inspect resolved variables and where they came from.
use std::fmt::{self, Write as _};
use std::io::Write;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, VarsCommand, VarsOpts};
use crate::config::Value;
use crate::error::NotFoundError;
use crate::logging::Logger;
use crate::variables::{TraceEntry, VariableResolver, VariableSource, VariableTree};

/// Run a `vars` subcommand and write its output to `out`.
///
/// # Errors
///
/// Returns an error if variables fail to resolve or the requested key does
/// not exist.
pub fn run(global: &GlobalOpts, opts: &VarsOpts, log: &Logger, out: &mut impl Write) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let output = match &opts.command {
        VarsCommand::Get { key } => format_get(&setup.variables, key)?,
        VarsCommand::Trace { key } => format_trace(&setup.resolver, key)?,
        VarsCommand::Sources => format_sources(setup.resolver.sources())?,
        VarsCommand::Dump { json } => format_dump(&setup.variables, *json)?,
    };
    out.write_all(output.as_bytes())?;
    Ok(())
}

/// Scalars print bare; mappings and sequences print as YAML.
fn format_get(tree: &VariableTree, key: &str) -> Result<String> {
    let value = tree
        .get(key)
        .ok_or_else(|| NotFoundError::Variable(key.to_string()))?;
    Ok(match value {
        Value::Scalar(s) => format!("{s}\n"),
        other => serde_yaml::to_string(other)?,
    })
}

fn format_trace(resolver: &VariableResolver, key: &str) -> Result<String> {
    let entries = resolver.trace(key);
    if entries.is_empty() {
        return Err(NotFoundError::Variable(key.to_string()).into());
    }
    let mut out = String::new();
    for TraceEntry {
        origin,
        layer,
        entry,
    } in &entries
    {
        let line = entry.line.map_or_else(String::new, |l| format!(":{l}"));
        let resolved = entry
            .resolved
            .as_ref()
            .map_or_else(|| "<unresolved>".to_string(), ToString::to_string);
        writeln!(
            out,
            "[{layer}] {}{line}  {} = {} -> {resolved}",
            origin.display(),
            entry.key,
            entry.raw
        )?;
    }
    Ok(out)
}

fn format_sources(sources: &[VariableSource]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for source in sources {
        writeln!(
            out,
            "[{}] {} ({} key(s))",
            source.layer,
            source.origin.display(),
            source.entries.len()
        )?;
    }
    Ok(out)
}

fn format_dump(tree: &VariableTree, json: bool) -> Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(tree)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(serde_yaml::to_string(tree)?)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::platform::{Os, Platform};
    use crate::variables::options::{Ambient, ResolutionOptions};
    use std::path::Path;

    fn resolved(root: &Path) -> (VariableResolver, VariableTree) {
        let ambient = Ambient::new(
            &Platform::new(Os::Linux, "bash", "box"),
            [("HOME".to_string(), "/home/ada".to_string())],
            &ResolutionOptions::default(),
        );
        let mut resolver = VariableResolver::new(root, &ambient);
        let tree = resolver.load_all().unwrap();
        (resolver, tree)
    }

    fn repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("variables")).unwrap();
        std::fs::write(
            dir.path().join("variables/index.yaml"),
            "variables:\n  editor:\n    default: vim\nimports:\n  - path: extra.yaml\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("variables/extra.yaml"),
            "editor:\n  default: nvim\n  config: \"{{ User.Home }}/.config/{{ editor.default }}\"\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn get_prints_scalars_bare() {
        let dir = repo();
        let (_, tree) = resolved(dir.path());
        assert_eq!(format_get(&tree, "editor.default").unwrap(), "nvim\n");
        assert_eq!(
            format_get(&tree, "editor.config").unwrap(),
            "/home/ada/.config/nvim\n"
        );
    }

    #[test]
    fn get_prints_mappings_as_yaml() {
        let dir = repo();
        let (_, tree) = resolved(dir.path());
        let out = format_get(&tree, "editor").unwrap();
        assert!(out.contains("default: nvim"));
    }

    #[test]
    fn get_unknown_key_is_not_found() {
        let dir = repo();
        let (_, tree) = resolved(dir.path());
        let err = format_get(&tree, "editor.theme").unwrap_err();
        assert_eq!(
            err.downcast_ref::<NotFoundError>(),
            Some(&NotFoundError::Variable("editor.theme".to_string()))
        );
    }

    #[test]
    fn trace_lists_layers_in_load_order() {
        let dir = repo();
        let (resolver, _) = resolved(dir.path());
        let out = format_trace(&resolver, "editor.default").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[0]") && lines[0].contains("= vim -> vim"));
        assert!(lines[1].starts_with("[1]") && lines[1].contains("= nvim -> nvim"));
    }

    #[test]
    fn trace_unknown_key_is_not_found() {
        let dir = repo();
        let (resolver, _) = resolved(dir.path());
        assert!(format_trace(&resolver, "missing").is_err());
    }

    #[test]
    fn sources_lists_every_file() {
        let dir = repo();
        let (resolver, _) = resolved(dir.path());
        let out = format_sources(resolver.sources()).unwrap();
        assert!(out.contains("index.yaml (1 key(s))"));
        assert!(out.contains("extra.yaml (2 key(s))"));
    }

    #[test]
    fn dump_json_and_yaml() {
        let dir = repo();
        let (_, tree) = resolved(dir.path());
        let json: serde_json::Value =
            serde_json::from_str(&format_dump(&tree, true).unwrap()).unwrap();
        assert_eq!(json["editor"]["default"], "nvim");
        assert!(format_dump(&tree, false).unwrap().contains("editor:"));
    }

    #[test]
    fn run_writes_the_value_to_the_sink() {
        let dir = repo();
        let global = GlobalOpts {
            root: Some(dir.path().to_path_buf()),
            ..GlobalOpts::default()
        };
        let opts = VarsOpts {
            command: VarsCommand::Get {
                key: "editor.default".to_string(),
            },
        };
        let mut out = Vec::new();
        run(&global, &opts, &Logger::new("test"), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "nvim\n");
    }
}
