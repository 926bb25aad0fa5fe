//! `install` action.
use anyhow::{Result, anyhow};
use serde::Deserialize;

use super::{ActionDoc, ExecutionResult, Module, ParamDoc, Plan, apply_resource, parse_params, plan_resource};
use crate::config::Mapping;
use crate::resources::Resource as _;
use crate::resources::package::{PackageManager, PackageResource};
use crate::tasks::context::ExecutionContext;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallParams {
    name: String,
    #[serde(default)]
    manager: Option<String>,
}

/// Install a system package through the platform's package manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct Install;

impl Install {
    fn resource<'a>(params: &Mapping, ctx: &'a ExecutionContext) -> Result<PackageResource<'a>> {
        let p: InstallParams = parse_params("install", params)?;
        let manager = match p.manager.as_deref() {
            Some(name) => name.parse::<PackageManager>().map_err(|e| anyhow!(e))?,
            None => PackageManager::detect(ctx.executor.as_ref())
                .ok_or_else(|| anyhow!("no supported package manager found on PATH"))?,
        };
        Ok(PackageResource::new(p.name, manager, ctx.executor.as_ref()))
    }
}

impl Module for Install {
    fn module(&self) -> &'static str {
        "packages"
    }

    fn action(&self) -> &'static str {
        "install"
    }

    fn renderable_fields(&self) -> &'static [&'static str] {
        &["name", "manager"]
    }

    fn primary_param(&self) -> &'static str {
        "name"
    }

    fn plan(&self, task_id: &str, params: &Mapping, ctx: &ExecutionContext) -> Result<Plan> {
        let resource = Self::resource(params, ctx)?;
        let mut plan = plan_resource(Plan::new(task_id, self.action(), resource.description()), &resource)?;
        if !plan.will_skip {
            let (program, args) = resource.install_command();
            plan.changes = vec![format!("run {}", crate::exec::command_line(program, &args))];
        }
        Ok(plan)
    }

    fn execute(&self, params: &Mapping, ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let resource = Self::resource(params, ctx)?;
        Ok(apply_resource(&resource)?
            .with_detail("package", resource.name.clone())
            .with_detail("manager", resource.manager.to_string()))
    }

    fn describe(&self) -> ActionDoc {
        ActionDoc {
            action: self.action(),
            module: self.module(),
            summary: "Install a package if the package manager reports it missing",
            params: vec![
                ParamDoc {
                    name: "name",
                    kind: "string",
                    required: true,
                    default: None,
                    description: "Package name (winget: package ID)",
                },
                ParamDoc {
                    name: "manager",
                    kind: "string",
                    required: false,
                    default: Some("auto"),
                    description: "One of pacman, paru, apt, dnf, brew, winget; detected from PATH when omitted",
                },
            ],
            examples: vec![
                "install: [git, neovim]",
                "install:\n  - name: Git.Git\n    manager: winget\n    condition: Platform.OS == \"windows\"",
            ],
        }
    }
}
