//! `symlink` action.
use anyhow::Result;
use serde::Deserialize;

use super::{ActionDoc, ExecutionResult, Module, ParamDoc, Plan, apply_resource, parse_params, plan_resource};
use crate::config::Mapping;
use crate::resources::Resource as _;
use crate::resources::symlink::SymlinkResource;
use crate::tasks::context::ExecutionContext;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SymlinkParams {
    source: String,
    target: String,
}

/// Point a link at a file or directory inside the repository.
#[derive(Debug, Default, Clone, Copy)]
pub struct Symlink;

impl Symlink {
    fn resource(params: &Mapping, ctx: &ExecutionContext) -> Result<SymlinkResource> {
        let p: SymlinkParams = parse_params("symlink", params)?;
        Ok(SymlinkResource::new(
            ctx.resolve_path(&p.source),
            ctx.resolve_path(&p.target),
        ))
    }
}

impl Module for Symlink {
    fn module(&self) -> &'static str {
        "symlinks"
    }

    fn action(&self) -> &'static str {
        "symlink"
    }

    fn renderable_fields(&self) -> &'static [&'static str] {
        &["source", "target"]
    }

    fn primary_param(&self) -> &'static str {
        "source"
    }

    fn plan(&self, task_id: &str, params: &Mapping, ctx: &ExecutionContext) -> Result<Plan> {
        let resource = Self::resource(params, ctx)?;
        plan_resource(Plan::new(task_id, self.action(), resource.description()), &resource)
    }

    fn execute(&self, params: &Mapping, ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let resource = Self::resource(params, ctx)?;
        Ok(apply_resource(&resource)?
            .with_detail("source", resource.source.display().to_string())
            .with_detail("target", resource.target.display().to_string()))
    }

    fn describe(&self) -> ActionDoc {
        ActionDoc {
            action: self.action(),
            module: self.module(),
            summary: "Create or replace a symbolic link",
            params: vec![
                ParamDoc {
                    name: "source",
                    kind: "string",
                    required: true,
                    default: None,
                    description: "Link destination, relative to the repository root",
                },
                ParamDoc {
                    name: "target",
                    kind: "string",
                    required: true,
                    default: None,
                    description: "Where the link is created; `~` expands to the home directory. \
                                  Existing files and links are replaced, real directories are not",
                },
            ],
            examples: vec![
                "symlink:\n  - source: files/zshrc\n    target: ~/.zshrc",
                "symlink:\n  - source: \"files/{{ Platform.OS }}/init.lua\"\n    target: ~/.config/nvim/init.lua",
            ],
        }
    }
}
