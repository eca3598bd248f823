// src/exec/mod.rs

//! Process execution layer.
//!
//! This module actually runs the commands declared by units, using
//! `tokio::process::Command`, and reports back an `ExecutionResult`.
//!
//! - [`backend`] provides the `ScriptExecutor` trait, the `ScriptRequest`
//!   type and the production `ShellExecutor`; tests replace the executor
//!   with a fake implementation.
//! - [`task_runner`] handles individual process execution and output
//!   forwarding.

pub mod backend;
pub mod task_runner;

pub use backend::{ScriptExecutor, ScriptRequest, ShellExecutor};
pub use task_runner::run_script_process;
