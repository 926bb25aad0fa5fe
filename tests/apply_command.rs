#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the apply pipeline.
//!
//! Each test writes a small declaration repository, resolves its variables,
//! loads its jobs and runs them through the engine with the built-in modules,
//! then checks both the run report and the resulting filesystem.

mod common;

use common::TestContextBuilder;
use dotstate_cli::logging::TaskStatus;
use dotstate_cli::platform::Os;
use dotstate_cli::tasks::engine::TaskOutcome;

const JOBS: &str = r#"
ensure_dir:
  - path: ~/.config/editor
ensure_file:
  - id: editor-config
    path: ~/.config/editor/settings.toml
    content: "editor = \"{{ editor.default }}\"\n"
  - path: ~/.windows-only
    content: "x"
    condition: Platform.OS == "windows"
"#;

fn editor_repo() -> common::IntegrationTestContext {
    TestContextBuilder::new()
        .with_variables_file("index.yaml", "variables:\n  editor:\n    default: nvim\n")
        .with_job_index(JOBS)
        .build()
}

// ---------------------------------------------------------------------------
// Apply and idempotence
// ---------------------------------------------------------------------------

#[test]
fn apply_creates_declared_state() {
    let ctx = editor_repo();
    let (report, _log) = ctx.run(Os::Linux, false);

    assert!(report.success(), "{report:#?}");
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.skipped(), 1);
    let written = std::fs::read_to_string(ctx.home().join(".config/editor/settings.toml")).unwrap();
    assert_eq!(written, "editor = \"nvim\"\n");
    assert!(!ctx.home().join(".windows-only").exists());
}

#[test]
fn second_apply_changes_nothing() {
    let ctx = editor_repo();
    let (first, _) = ctx.run(Os::Linux, false);
    assert!(first.success());

    let (second, log) = ctx.run(Os::Linux, false);
    assert!(second.success());
    assert_eq!(second.succeeded(), 0);
    assert_eq!(second.skipped(), 3);
    let unchanged = log
        .task_entries()
        .iter()
        .filter(|e| e.status == TaskStatus::Unchanged)
        .count();
    assert_eq!(unchanged, 2);
}

#[test]
fn task_ids_are_explicit_or_derived() {
    let ctx = editor_repo();
    let (report, _) = ctx.run(Os::Linux, true);
    let ids: Vec<&str> = report.tasks.iter().map(|t| t.task_id.as_str()).collect();
    assert_eq!(ids, vec!["ensure_dir-1", "editor-config", "ensure_file-2"]);
}

#[test]
fn condition_follows_platform() {
    let ctx = editor_repo();
    let (report, _) = ctx.run(Os::Windows, false);
    assert!(report.success());
    assert!(ctx.home().join(".windows-only").exists());
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_touches_nothing() {
    let ctx = editor_repo();
    let (report, log) = ctx.run(Os::Linux, true);

    assert!(report.success());
    assert_eq!(report.pending(), 2);
    assert!(!ctx.home().join(".config").exists());
    assert!(
        log.task_entries()
            .iter()
            .any(|e| e.status == TaskStatus::DryRun)
    );
}

#[test]
fn dry_run_succeeds_even_when_planning_fails() {
    let ctx = TestContextBuilder::new()
        .with_job_index("ensure_file:\n  - path: ~/out\n    source: missing.txt\n")
        .build();
    let (report, _) = ctx.run(Os::Linux, true);
    assert_eq!(report.failed(), 1);
    assert!(report.success());
}

// ---------------------------------------------------------------------------
// Failure isolation and exit status
// ---------------------------------------------------------------------------

#[test]
fn failing_task_does_not_stop_the_run() {
    let ctx = TestContextBuilder::new()
        .with_job_index(
            "ensure_file:\n  - path: ~/a\n    source: missing.txt\n  - path: ~/b\n    content: ok\n",
        )
        .build();
    let (report, log) = ctx.run(Os::Linux, false);

    assert!(!report.success());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    assert!(matches!(report.tasks[0].outcome, TaskOutcome::PlanFailed { .. }));
    assert_eq!(std::fs::read_to_string(ctx.home().join("b")).unwrap(), "ok");
    assert_eq!(log.failure_count(), 1);
}

#[test]
fn unknown_action_fails_only_its_task() {
    let ctx = TestContextBuilder::new()
        .with_job_index("frobnicate:\n  - thing: x\nensure_dir:\n  - path: ~/d\n")
        .build();
    let (report, _) = ctx.run(Os::Linux, false);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    assert!(ctx.home().join("d").is_dir());
}

#[test]
fn undefined_variable_is_a_planning_failure() {
    let ctx = TestContextBuilder::new()
        .with_job_index("ensure_dir:\n  - path: \"~/{{ nope.missing }}\"\n")
        .build();
    let (report, _) = ctx.run(Os::Linux, false);
    assert_eq!(report.failed(), 1);
    assert!(!report.success());
}

// ---------------------------------------------------------------------------
// Links and templated sources
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn symlinks_point_into_the_repository() {
    let ctx = TestContextBuilder::new()
        .with_file("files/zshrc", "export EDITOR=nvim\n")
        .with_job_index("symlink:\n  - source: files/zshrc\n    target: ~/.zshrc\n")
        .build();
    let (report, _) = ctx.run(Os::Linux, false);
    assert!(report.success());
    let link = std::fs::read_link(ctx.home().join(".zshrc")).unwrap();
    assert_eq!(link, ctx.root_path().join("files/zshrc"));

    let (again, _) = ctx.run(Os::Linux, false);
    assert_eq!(again.succeeded(), 0);
}

#[test]
fn templated_source_renders_against_variables() {
    let ctx = TestContextBuilder::new()
        .with_variables_file("index.yaml", "variables:\n  git:\n    email: me@example.com\n")
        .with_file("files/gitconfig", "[user]\n  email = {{ git.email }}\n")
        .with_job_index(
            "ensure_file:\n  - path: ~/.gitconfig\n    source: files/gitconfig\n    template: true\n",
        )
        .build();
    let (report, _) = ctx.run(Os::Linux, false);
    assert!(report.success(), "{report:#?}");
    assert_eq!(
        std::fs::read_to_string(ctx.home().join(".gitconfig")).unwrap(),
        "[user]\n  email = me@example.com\n"
    );
}
