//! Two-phase plan/apply engine.
//!
//! Every task is planned first.  Outside dry-run mode a plan that is not
//! skipped is then executed.  Planning and execution failures are contained
//! at the task boundary: they become a failed [`TaskReport`] and the run
//! moves on to the next task.
use serde::Serialize;

use super::Task;
use super::context::ExecutionContext;
use crate::config::Mapping;
use crate::error::PlanError;
use crate::logging::TaskStatus;
use crate::modules::registry::ModuleRegistry;
use crate::modules::{ExecutionResult, Module, Plan};

/// Skip reason for a task whose condition is false.
pub const CONDITION_FALSE: &str = "condition is false";

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The task could not be planned.
    PlanFailed {
        /// Planning error.
        error: String,
    },
    /// The condition was false or nothing needed to change.
    Skipped {
        /// The skip plan.
        plan: Plan,
    },
    /// Changes were planned but not applied (dry run).
    Pending {
        /// The plan that would run.
        plan: Plan,
    },
    /// Changes were applied.
    Applied {
        /// The plan that ran.
        plan: Plan,
        /// Execution outcome.
        result: ExecutionResult,
    },
    /// Execution failed.
    Failed {
        /// The plan that was attempted.
        plan: Plan,
        /// Execution error.
        error: String,
    },
}

impl TaskOutcome {
    /// Status recorded in the run summary.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::PlanFailed { .. } | Self::Failed { .. } => TaskStatus::Failed,
            Self::Skipped { plan } if plan.is_satisfied() => TaskStatus::Unchanged,
            Self::Skipped { .. } => TaskStatus::Skipped,
            Self::Pending { .. } => TaskStatus::DryRun,
            Self::Applied { .. } => TaskStatus::Applied,
        }
    }

    /// The plan, if planning succeeded.
    #[must_use]
    pub const fn plan(&self) -> Option<&Plan> {
        match self {
            Self::PlanFailed { .. } => None,
            Self::Skipped { plan }
            | Self::Pending { plan }
            | Self::Applied { plan, .. }
            | Self::Failed { plan, .. } => Some(plan),
        }
    }
}

/// Per-task entry of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    /// Task id.
    pub task_id: String,
    /// Task action.
    pub action: String,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Ordered outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// One entry per task, in declaration order.
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    fn count(&self, f: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.tasks.iter().filter(|t| f(&t.outcome)).count()
    }

    /// Tasks that applied changes.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Applied { .. }))
    }

    /// Tasks skipped by condition or already satisfied.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Skipped { .. }))
    }

    /// Tasks with planned but unapplied changes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Pending { .. }))
    }

    /// Tasks that failed to plan or execute.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::PlanFailed { .. } | TaskOutcome::Failed { .. }))
    }

    /// Whether the process should exit successfully.
    ///
    /// A dry run always succeeds; otherwise no task may have failed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.dry_run || self.failed() == 0
    }
}

fn lookup<'r>(registry: &'r ModuleRegistry, task: &Task) -> Result<&'r dyn Module, PlanError> {
    registry.get(&task.action).ok_or_else(|| PlanError::UnknownAction {
        task: task.id.clone(),
        action: task.action.clone(),
    })
}

/// Evaluate every condition of `task`; all must hold.
fn conditions_hold(task: &Task, ctx: &ExecutionContext) -> Result<bool, PlanError> {
    for condition in &task.conditions {
        let holds = ctx
            .renderer
            .eval_condition(&format!("{}.condition", task.id), condition, ctx.variables.as_value())
            .map_err(|source| PlanError::Condition {
                task: task.id.clone(),
                source,
            })?;
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Render the module's renderable fields of `task` against the variables.
///
/// Only string values (including strings nested in lists and mappings) are
/// rendered; other parameters pass through untouched.
fn render_params(
    task: &Task,
    module: &dyn Module,
    ctx: &ExecutionContext,
) -> Result<Mapping, PlanError> {
    let mut params = task.parameters.clone();
    let vars = ctx.renderer.context(ctx.variables.as_value());
    for field in module.renderable_fields() {
        let Some(value) = params.get_mut(*field) else {
            continue;
        };
        let location = format!("{}.{field}", task.id);
        value
            .try_map_strings(&mut |s| ctx.renderer.render_with(&location, s, &vars))
            .map_err(|source| PlanError::Field {
                task: task.id.clone(),
                field: (*field).to_string(),
                source,
            })?;
    }
    Ok(params)
}

/// Plan one task without mutating anything.
///
/// A false condition yields a skip plan without consulting the module.
///
/// # Errors
///
/// Returns a [`PlanError`] naming the task for an unknown action, an
/// invalid condition, an unrenderable field, or a module rejection.
pub fn plan_task(
    task: &Task,
    registry: &ModuleRegistry,
    ctx: &ExecutionContext,
) -> Result<Plan, PlanError> {
    let module = lookup(registry, task)?;
    if !conditions_hold(task, ctx)? {
        return Ok(Plan::new(&task.id, &task.action, task.action.clone()).skipped(CONDITION_FALSE));
    }
    let params = render_params(task, module, ctx)?;
    module
        .plan(&task.id, &params, ctx)
        .map_err(|e| PlanError::Module {
            task: task.id.clone(),
            message: format!("{e:#}"),
        })
}

/// Execute one task.
///
/// Must only be called for a task whose plan is not skipped; the condition
/// is not re-evaluated here.
///
/// # Errors
///
/// Returns the module's execution error, or a [`PlanError`] if the task
/// can no longer be routed or rendered.
pub fn execute_task(
    task: &Task,
    registry: &ModuleRegistry,
    ctx: &ExecutionContext,
) -> anyhow::Result<ExecutionResult> {
    let module = lookup(registry, task)?;
    let params = render_params(task, module, ctx)?;
    let result = module.execute(&params, ctx)?;
    if !result.success {
        anyhow::bail!("{}", result.message);
    }
    Ok(result)
}

/// Plan and (unless dry-running) apply one task, logging as it goes.
fn run_task(task: &Task, registry: &ModuleRegistry, ctx: &ExecutionContext) -> TaskOutcome {
    let plan = match plan_task(task, registry, ctx) {
        Ok(plan) => plan,
        Err(e) => {
            return TaskOutcome::PlanFailed {
                error: e.to_string(),
            };
        }
    };
    ctx.log.stage(&format!("{}: {}", task.id, plan.description));

    if plan.will_skip {
        let reason = plan.skip_reason.as_deref().unwrap_or_default();
        ctx.log.info(&format!("skipped: {reason}"));
        return TaskOutcome::Skipped { plan };
    }

    if ctx.dry_run {
        for change in &plan.changes {
            ctx.log.dry_run(change);
        }
        return TaskOutcome::Pending { plan };
    }

    for change in &plan.changes {
        if ctx.verbose {
            ctx.log.info(change);
        } else {
            ctx.log.debug(change);
        }
    }
    match execute_task(task, registry, ctx) {
        Ok(result) => {
            ctx.log.debug(&result.message);
            TaskOutcome::Applied { plan, result }
        }
        Err(e) => TaskOutcome::Failed {
            plan,
            error: format!("{e:#}"),
        },
    }
}

/// Run every task in declaration order.
///
/// Each outcome is recorded in `ctx.log` for the end-of-run summary.
#[must_use]
pub fn run(tasks: &[Task], registry: &ModuleRegistry, ctx: &ExecutionContext) -> RunReport {
    let mut report = RunReport {
        dry_run: ctx.dry_run,
        tasks: Vec::with_capacity(tasks.len()),
    };
    for task in tasks {
        let outcome = run_task(task, registry, ctx);
        let message = match &outcome {
            TaskOutcome::PlanFailed { error } | TaskOutcome::Failed { error, .. } => {
                ctx.log.error(error);
                Some(error.clone())
            }
            TaskOutcome::Skipped { plan } => plan.skip_reason.clone(),
            TaskOutcome::Pending { plan } => Some(format!("{} change(s)", plan.changes.len())),
            TaskOutcome::Applied { .. } => None,
        };
        ctx.log.record_task(&task.id, outcome.status(), message.as_deref());
        report.tasks.push(TaskReport {
            task_id: task.id.clone(),
            action: task.action.clone(),
            outcome,
        });
    }
    report
}
