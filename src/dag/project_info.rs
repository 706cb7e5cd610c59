// src/dag/project_info.rs

//! Project metadata and per-run scheduling state.

use crate::dag::graph::{ProjectGraph, ProjectId};

/// Per-run state of a project (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Dirty in this run, waiting on dependencies or on a free slot.
    Pending,
    /// Handed to the executor.
    Running,
    /// Built (or found up to date) in this run.
    DoneSuccess,
    /// Its build failed in this run.
    DoneFailed,
    /// Never dispatched because a dependency failed.
    Blocked,
}

/// Public, read-only view of a project's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectRunState {
    /// Not part of the current run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Blocked,
}

impl From<Option<RunState>> for ProjectRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => ProjectRunState::NotInRun,
            Some(RunState::Pending) => ProjectRunState::Pending,
            Some(RunState::Running) => ProjectRunState::Running,
            Some(RunState::DoneSuccess) => ProjectRunState::DoneSuccess,
            Some(RunState::DoneFailed) => ProjectRunState::DoneFailed,
            Some(RunState::Blocked) => ProjectRunState::Blocked,
        }
    }
}

/// Static project information plus per-run state.
#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub name: String,
    pub deps: Vec<ProjectId>,
    pub critical_path_length: usize,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,
    /// Made dirty again while running; rebuilt once the current build ends.
    pub rebuild_requested: bool,

    pub last_successful_run: Option<u64>,
    pub last_failed_run: Option<u64>,
}

impl ProjectInfo {
    pub fn from_graph(graph: &ProjectGraph, id: ProjectId) -> Self {
        Self {
            id,
            name: graph.name(id).to_string(),
            deps: graph.dependencies_of(id),
            critical_path_length: graph.critical_path_length(id),
            run_state: None,
            rebuild_requested: false,
            last_successful_run: None,
            last_failed_run: None,
        }
    }

    /// Whether the most recent finished build of this project failed.
    pub fn last_build_failed(&self) -> bool {
        match (self.last_failed_run, self.last_successful_run) {
            (Some(failed), Some(succeeded)) => failed > succeeded,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// A project the scheduler wants built now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledBuild {
    pub project: ProjectId,
    pub name: String,
    pub cmd: String,
    pub config_hash: String,
    /// All builds dispatched during one run share the same id.
    pub run_id: u64,
}

impl ScheduledBuild {
    pub fn new(graph: &ProjectGraph, id: ProjectId, run_id: u64) -> Self {
        let project = graph.project(id);
        Self {
            project: id,
            name: project.name.clone(),
            cmd: project.cmd.clone(),
            config_hash: project.config_hash.clone(),
            run_id,
        }
    }
}
