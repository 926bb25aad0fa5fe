//! Pluggable action implementations.
//!
//! A [`Module`] owns one action name (e.g. `symlink`), the schema of that
//! action's parameters, and the plan/execute logic that reconciles live state
//! with the declaration.  Modules are registered explicitly in
//! [`registry::ModuleRegistry::builtin`].
pub mod files;
pub mod packages;
pub mod registry;
pub mod symlinks;

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{Mapping, Value};
use crate::resources::{Resource, ResourceChange, ResourceState};
use crate::tasks::context::ExecutionContext;

/// Skip reason reported when live state already matches the declaration.
pub const ALREADY_SATISFIED: &str = "already satisfied";

/// Preview of one task's required changes, computed without mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Task id.
    pub task_id: String,
    /// Action the task routes to.
    pub action: String,
    /// Human-readable description of the desired state.
    pub description: String,
    /// Discrete effects that executing the task would have, in order.
    pub changes: Vec<String>,
    /// Whether execution must be skipped.
    pub will_skip: bool,
    /// Why the task is skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl Plan {
    /// Create a plan with no changes yet.
    #[must_use]
    pub fn new(task_id: &str, action: &str, description: impl Into<String>) -> Self {
        Self {
            task_id: task_id.to_string(),
            action: action.to_string(),
            description: description.into(),
            changes: Vec::new(),
            will_skip: false,
            skip_reason: None,
        }
    }

    /// Mark the plan as skipped.
    #[must_use]
    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.will_skip = true;
        self.skip_reason = Some(reason.into());
        self
    }

    /// Return `true` if the task is skipped because nothing needs to change.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.will_skip && self.skip_reason.as_deref() == Some(ALREADY_SATISFIED)
    }
}

/// Outcome of executing one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Whether the mutation succeeded.
    pub success: bool,
    /// Confirmation or failure detail.
    pub message: String,
    /// Structured side-effect data (paths written, package manager used).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ExecutionResult {
    /// A successful result.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Attach a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Documentation for one parameter of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamDoc {
    /// Parameter name.
    pub name: &'static str,
    /// Value type as written in declarations.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Default used when the parameter is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    /// What the parameter controls.
    pub description: &'static str,
}

/// Static documentation for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDoc {
    /// Action name used as a job section key.
    pub action: &'static str,
    /// Module group the action belongs to.
    pub module: &'static str,
    /// One-line summary.
    pub summary: &'static str,
    /// Accepted parameters.
    pub params: Vec<ParamDoc>,
    /// Declaration snippets.
    pub examples: Vec<&'static str>,
}

/// Documentation for a module group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDoc {
    /// Module group name.
    pub module: &'static str,
    /// Actions in the group.
    pub actions: Vec<ActionDoc>,
}

/// One action kind: parameter schema plus plan/execute logic.
///
/// `plan` must not mutate the system.  `execute` is only called for plans
/// with `will_skip == false` and outside dry-run mode.
pub trait Module: Send + Sync + std::fmt::Debug {
    /// Module group name (`files`, `symlinks`, `packages`).
    fn module(&self) -> &'static str;

    /// Action name routed to this module.
    fn action(&self) -> &'static str;

    /// Parameters whose string values are rendered as templates before
    /// planning.
    fn renderable_fields(&self) -> &'static [&'static str];

    /// Parameter that a bare scalar list item fills (`install: [git]`).
    fn primary_param(&self) -> &'static str;

    /// Compare live state with the declaration.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed parameters or state that cannot be
    /// reconciled (e.g. a real directory where a symlink should go).
    fn plan(&self, task_id: &str, params: &Mapping, ctx: &ExecutionContext) -> Result<Plan>;

    /// Perform the mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails; later steps are not attempted.
    fn execute(&self, params: &Mapping, ctx: &ExecutionContext) -> Result<ExecutionResult>;

    /// Static documentation.
    fn describe(&self) -> ActionDoc;
}

/// Deserialize a task's parameter mapping into a module's typed schema.
///
/// # Errors
///
/// Returns an error naming the action if a field is missing, unknown, or
/// of the wrong type.
pub fn parse_params<T: DeserializeOwned>(action: &str, params: &Mapping) -> Result<T> {
    let json = serde_json::Value::from(&Value::Mapping(params.clone()));
    serde_json::from_value(json).with_context(|| format!("invalid {action} parameters"))
}

/// Build a plan from a resource's current state.
///
/// # Errors
///
/// Returns an error if the state cannot be read or is
/// [`ResourceState::Invalid`].
pub fn plan_resource(plan: Plan, resource: &dyn Resource) -> Result<Plan> {
    let mut plan = plan;
    match resource.current_state()? {
        ResourceState::Correct => return Ok(plan.skipped(ALREADY_SATISFIED)),
        ResourceState::Missing => plan.changes.push(format!("create {}", resource.description())),
        ResourceState::Incorrect { current } => plan
            .changes
            .push(format!("update {} (currently {current})", resource.description())),
        ResourceState::Invalid { reason } => anyhow::bail!(reason),
    }
    Ok(plan)
}

/// Apply a resource and describe the result.
///
/// # Errors
///
/// Returns the resource's apply error with its description as context.
pub fn apply_resource(resource: &dyn Resource) -> Result<ExecutionResult> {
    let description = resource.description();
    let change = resource
        .apply()
        .with_context(|| format!("failed to apply {description}"))?;
    Ok(ExecutionResult::ok(match change {
        ResourceChange::Applied => format!("applied {description}"),
        ResourceChange::AlreadyCorrect => format!("{description}: {ALREADY_SATISFIED}"),
    }))
}
