//! Commands: list and describe the registered actions.
use std::fmt::{self, Write as _};
use std::io::Write;

use anyhow::Result;

use crate::cli::ExplainOpts;
use crate::modules::registry::ModuleRegistry;
use crate::modules::{ActionDoc, ModuleDoc};

/// Write every action with its module group and summary to `out`.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub fn run_actions(out: &mut impl Write) -> Result<()> {
    let text = format_actions(&ModuleRegistry::builtin().list_all_actions())?;
    out.write_all(text.as_bytes())?;
    Ok(())
}

/// Write the documentation of one action or of a whole module group.
///
/// # Errors
///
/// Returns a not-found error for unknown actions or modules.
pub fn run(opts: &ExplainOpts, out: &mut impl Write) -> Result<()> {
    let registry = ModuleRegistry::builtin();
    let text = match (&opts.module, &opts.action) {
        (Some(module), _) => format_module(&registry.explain_module(module)?)?,
        (None, Some(action)) => format_action(&registry.explain_action(action)?)?,
        (None, None) => anyhow::bail!("explain needs an action or --module"),
    };
    out.write_all(text.as_bytes())?;
    Ok(())
}

fn format_actions(actions: &[ActionDoc]) -> Result<String, fmt::Error> {
    let width = actions.iter().map(|a| a.action.len()).max().unwrap_or(0);
    let mut out = String::new();
    for doc in actions {
        writeln!(out, "{:width$}  [{}] {}", doc.action, doc.module, doc.summary)?;
    }
    Ok(out)
}

fn format_action(doc: &ActionDoc) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{} ({})", doc.action, doc.module)?;
    writeln!(out, "  {}", doc.summary)?;
    out.push_str("\nParameters:\n");
    for param in &doc.params {
        let required = if param.required { "required" } else { "optional" };
        let default = param
            .default
            .map_or_else(String::new, |d| format!(", default {d}"));
        writeln!(
            out,
            "  {} ({}, {required}{default})\n      {}",
            param.name, param.kind, param.description
        )?;
    }
    if !doc.examples.is_empty() {
        out.push_str("\nExamples:\n");
        for example in &doc.examples {
            for line in example.lines() {
                writeln!(out, "  {line}")?;
            }
            out.push('\n');
        }
    }
    Ok(out)
}

fn format_module(doc: &ModuleDoc) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "module {}\n", doc.module)?;
    for action in &doc.actions {
        out.push_str(&format_action(action)?);
        out.push('\n');
    }
    Ok(out)
}
