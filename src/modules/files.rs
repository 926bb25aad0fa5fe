//! `ensure_dir` and `ensure_file` actions.
use anyhow::{Context as _, Result};
use serde::Deserialize;

use super::{ActionDoc, ExecutionResult, Module, ParamDoc, Plan, apply_resource, parse_params, plan_resource};
use crate::config::Mapping;
use crate::resources::directory::DirectoryResource;
use crate::resources::file::FileResource;
use crate::resources::parse_mode;
use crate::tasks::context::ExecutionContext;

const GROUP: &str = "files";

/// Permission bits written either as a string (`"0755"`) or as a bare
/// number (`755`); both are read as octal.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ModeParam {
    Text(String),
    Number(u64),
}

impl ModeParam {
    fn octal(&self) -> Result<u32> {
        match self {
            Self::Text(s) => parse_mode(s),
            Self::Number(n) => parse_mode(&n.to_string()),
        }
    }
}

fn parse_optional_mode(mode: Option<&ModeParam>) -> Result<Option<u32>> {
    mode.map(ModeParam::octal).transpose()
}

fn mode_doc() -> ParamDoc {
    ParamDoc {
        name: "mode",
        kind: "string",
        required: false,
        default: None,
        description: "Octal permission bits such as \"0755\" (ignored on Windows)",
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirParams {
    path: String,
    #[serde(default)]
    mode: Option<ModeParam>,
}

/// Ensure a directory exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsureDir;

impl EnsureDir {
    fn resource(params: &Mapping, ctx: &ExecutionContext) -> Result<DirectoryResource> {
        let p: DirParams = parse_params("ensure_dir", params)?;
        Ok(DirectoryResource::new(
            ctx.resolve_path(&p.path),
            parse_optional_mode(p.mode.as_ref())?,
        ))
    }
}

impl Module for EnsureDir {
    fn module(&self) -> &'static str {
        GROUP
    }

    fn action(&self) -> &'static str {
        "ensure_dir"
    }

    fn renderable_fields(&self) -> &'static [&'static str] {
        &["path", "mode"]
    }

    fn primary_param(&self) -> &'static str {
        "path"
    }

    fn plan(&self, task_id: &str, params: &Mapping, ctx: &ExecutionContext) -> Result<Plan> {
        let resource = Self::resource(params, ctx)?;
        plan_resource(
            Plan::new(task_id, self.action(), resource.path.display().to_string()),
            &resource,
        )
    }

    fn execute(&self, params: &Mapping, ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let resource = Self::resource(params, ctx)?;
        Ok(apply_resource(&resource)?.with_detail("path", resource.path.display().to_string()))
    }

    fn describe(&self) -> ActionDoc {
        ActionDoc {
            action: self.action(),
            module: GROUP,
            summary: "Create a directory (and its parents) if missing",
            params: vec![
                ParamDoc {
                    name: "path",
                    kind: "string",
                    required: true,
                    default: None,
                    description: "Directory to create; `~` expands to the home directory",
                },
                mode_doc(),
            ],
            examples: vec!["ensure_dir:\n  - path: ~/.config/nvim\n    mode: \"0700\""],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileParams {
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    template: bool,
    #[serde(default)]
    mode: Option<ModeParam>,
}

/// Ensure a file exists with exact content, copied or rendered from a
/// source file or given inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsureFile;

impl EnsureFile {
    fn resource(params: &Mapping, ctx: &ExecutionContext) -> Result<FileResource> {
        let p: FileParams = parse_params("ensure_file", params)?;
        let content = match (p.content, p.source) {
            (Some(_), Some(_)) => anyhow::bail!("'content' and 'source' are mutually exclusive"),
            (Some(content), None) => content.into_bytes(),
            (None, Some(source)) => {
                let path = ctx.resolve_path(&source);
                if p.template {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("read template {}", path.display()))?;
                    ctx.renderer
                        .render(&source, &text, ctx.variables.as_value())?
                        .into_bytes()
                } else {
                    std::fs::read(&path).with_context(|| format!("read source {}", path.display()))?
                }
            }
            (None, None) => Vec::new(),
        };
        Ok(FileResource::new(
            ctx.resolve_path(&p.path),
            content,
            parse_optional_mode(p.mode.as_ref())?,
        ))
    }
}

impl Module for EnsureFile {
    fn module(&self) -> &'static str {
        GROUP
    }

    fn action(&self) -> &'static str {
        "ensure_file"
    }

    fn renderable_fields(&self) -> &'static [&'static str] {
        &["path", "content", "source", "mode"]
    }

    fn primary_param(&self) -> &'static str {
        "path"
    }

    fn plan(&self, task_id: &str, params: &Mapping, ctx: &ExecutionContext) -> Result<Plan> {
        let resource = Self::resource(params, ctx)?;
        plan_resource(
            Plan::new(task_id, self.action(), resource.path.display().to_string()),
            &resource,
        )
    }

    fn execute(&self, params: &Mapping, ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let resource = Self::resource(params, ctx)?;
        Ok(apply_resource(&resource)?
            .with_detail("path", resource.path.display().to_string())
            .with_detail("bytes", resource.content.len().to_string()))
    }

    fn describe(&self) -> ActionDoc {
        ActionDoc {
            action: self.action(),
            module: GROUP,
            summary: "Write a file with exact content, replacing it atomically when it differs",
            params: vec![
                ParamDoc {
                    name: "path",
                    kind: "string",
                    required: true,
                    default: None,
                    description: "File to write; `~` expands to the home directory",
                },
                ParamDoc {
                    name: "content",
                    kind: "string",
                    required: false,
                    default: None,
                    description: "Inline content (exclusive with `source`)",
                },
                ParamDoc {
                    name: "source",
                    kind: "string",
                    required: false,
                    default: None,
                    description: "File to copy, relative to the repository root",
                },
                ParamDoc {
                    name: "template",
                    kind: "bool",
                    required: false,
                    default: Some("false"),
                    description: "Render `source` through the variable tree before writing",
                },
                mode_doc(),
            ],
            examples: vec![
                "ensure_file:\n  - path: ~/.gitconfig\n    source: files/gitconfig.tmpl\n    template: true",
                "ensure_file:\n  - path: ~/.hushlogin\n    content: \"\"",
            ],
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Value;
    use crate::tasks::test_helpers::{make_context, make_context_with_vars, params};

    #[test]
    fn ensure_dir_plans_then_is_satisfied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let p = params(&[("path", "out/sub")]);

        let plan = EnsureDir.plan("ensure_dir-1", &p, &ctx).unwrap();
        assert!(!plan.will_skip);
        assert_eq!(plan.changes.len(), 1);

        let result = EnsureDir.execute(&p, &ctx).unwrap();
        assert!(result.success);
        assert!(dir.path().join("out/sub").is_dir());

        assert!(EnsureDir.plan("ensure_dir-1", &p, &ctx).unwrap().is_satisfied());
    }

    #[test]
    fn ensure_dir_rejects_unknown_parameter() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let p = params(&[("path", "x"), ("owner", "root")]);
        assert!(EnsureDir.plan("ensure_dir-1", &p, &ctx).is_err());
    }

    #[test]
    fn ensure_dir_with_file_in_the_way_fails_to_plan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "x").unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let err = EnsureDir.plan("ensure_dir-1", &params(&[("path", "f")]), &ctx).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[cfg(unix)]
    #[test]
    fn ensure_dir_accepts_numeric_mode() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let mut p = params(&[("path", "private")]);
        p.insert("mode".to_string(), Value::Scalar(crate::config::Scalar::Integer(700)));
        EnsureDir.execute(&p, &ctx).unwrap();
        assert_eq!(
            crate::resources::current_mode(&dir.path().join("private")),
            Some(0o700)
        );
    }

    #[test]
    fn ensure_file_inline_content_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let p = params(&[("path", "a/b.txt"), ("content", "hello\n")]);

        assert!(!EnsureFile.plan("ensure_file-1", &p, &ctx).unwrap().will_skip);
        let result = EnsureFile.execute(&p, &ctx).unwrap();
        assert_eq!(result.details.get("bytes").map(String::as_str), Some("6"));
        assert_eq!(std::fs::read_to_string(dir.path().join("a/b.txt")).unwrap(), "hello\n");
        assert!(EnsureFile.plan("ensure_file-1", &p, &ctx).unwrap().is_satisfied());
    }

    #[test]
    fn ensure_file_copies_source_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("files")).unwrap();
        std::fs::write(dir.path().join("files/vimrc"), "set nu {{ not rendered }}\n").unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let p = params(&[("path", "~/.vimrc"), ("source", "files/vimrc")]);

        EnsureFile.execute(&p, &ctx).unwrap();
        assert_eq!(
            std::fs::read_to_string(ctx.home.join(".vimrc")).unwrap(),
            "set nu {{ not rendered }}\n"
        );
    }

    #[test]
    fn ensure_file_renders_template_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("gitconfig.tmpl"),
            "[user]\n  name = {{ git.name }}\n",
        )
        .unwrap();
        let vars = crate::config::loader::parse_tree(
            std::path::Path::new("vars.yaml"),
            crate::config::Format::Yaml,
            "git:\n  name: Ada\n",
        )
        .unwrap();
        let ctx = make_context_with_vars(dir.path().to_path_buf(), vars);
        let mut p = params(&[("path", "out/gitconfig"), ("source", "gitconfig.tmpl")]);
        p.insert("template".to_string(), Value::Scalar(crate::config::Scalar::Bool(true)));

        EnsureFile.execute(&p, &ctx).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/gitconfig")).unwrap(),
            "[user]\n  name = Ada\n"
        );
    }

    #[test]
    fn ensure_file_content_and_source_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let p = params(&[("path", "x"), ("content", "a"), ("source", "b")]);
        let err = EnsureFile.plan("ensure_file-1", &p, &ctx).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn ensure_file_missing_source_fails_to_plan() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(dir.path().to_path_buf());
        let p = params(&[("path", "x"), ("source", "missing.txt")]);
        let err = EnsureFile.plan("ensure_file-1", &p, &ctx).unwrap_err();
        assert!(format!("{err:#}").contains("missing.txt"));
    }

    #[test]
    fn describe_lists_required_path() {
        let doc = EnsureFile.describe();
        assert_eq!(doc.module, "files");
        assert!(doc.params.iter().any(|p| p.name == "path" && p.required));
    }
}
