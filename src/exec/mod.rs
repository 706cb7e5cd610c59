// src/exec/mod.rs

//! Build execution layer.
//!
//! This module runs project commands with `tokio::process::Command` and
//! reports back to the runtime via `RuntimeEvent`s.
//!
//! - [`backend`] provides the `BuildExecutor` trait and the production
//!   `ShellExecutor`; tests replace it with a fake.
//! - [`executor_loop`] owns the loop that starts one worker per build.
//! - [`task_runner`] is that worker: fingerprint check, process, persist.
//! - [`context`] bundles what workers share (graph, filesystem, caches).

pub mod backend;
pub mod context;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{BuildExecutor, ShellExecutor};
pub use context::BuildContext;
pub use executor_loop::spawn_executor;
