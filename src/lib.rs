//! Declarative machine-state engine.
//!
//! Describes a machine (files, directories, symlinks, packages) in layered
//! YAML or TOML declarations parameterised by platform, shell, hostname and
//! environment, then reconciles the live machine toward it with a
//! plan-then-apply protocol that can always be previewed first.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: parse declaration files into a tagged value tree
//! - **[`variables`]**: import, merge and render variables with provenance
//! - **[`resources`]**: idempotent `current_state + apply` primitives
//! - **[`modules`]**: actions that turn task parameters into resources
//! - **[`tasks`]**: load jobs, evaluate conditions, plan and execute
//! - **[`commands`]**: top-level subcommand orchestration (`apply`, `vars`, …)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod modules;
pub mod platform;
pub mod resources;
pub mod tasks;
pub mod variables;
