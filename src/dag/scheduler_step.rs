// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::graph::ProjectId;
use crate::dag::project_info::ScheduledBuild;

/// Structured result of a single scheduler "step".
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Builds to dispatch now, highest critical path first.
    pub newly_scheduled: Vec<ScheduledBuild>,
    /// Projects that will not build in this run because a dependency failed.
    pub newly_blocked: Vec<ProjectId>,
    /// Whether this step left nothing pending or running.
    pub run_just_finished: bool,
}
