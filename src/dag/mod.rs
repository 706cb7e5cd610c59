// src/dag/mod.rs

//! Project graph and build scheduling.
//!
//! - [`graph`] owns the projects, their dependency edges and critical path
//!   lengths (and rejects cycles).
//! - [`scheduler`] decides which dirty projects are ready to build.
//! - [`project_info`] provides project metadata and scheduled build types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod project_info;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;

pub use graph::{Project, ProjectGraph, ProjectId, FINGERPRINT_FILE_NAME};
pub use project_info::{ProjectRunState, ScheduledBuild};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
