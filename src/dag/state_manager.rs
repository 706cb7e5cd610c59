// src/dag/state_manager.rs

//! Per-run state management for projects in the scheduler.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::dag::graph::{ProjectGraph, ProjectId};
use crate::dag::project_info::{ProjectInfo, RunState, ScheduledBuild};

/// Whether a pending project's dependencies let it build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepStatus {
    Ready,
    Waiting,
    Blocked,
}

/// Manages per-run state transitions for projects.
pub struct StateManager<'a> {
    graph: &'a ProjectGraph,
    projects: &'a mut [ProjectInfo],
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a ProjectGraph,
        projects: &'a mut [ProjectInfo],
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            projects,
            current_run_id,
        }
    }

    /// Include dirty projects and everything downstream of them in this run.
    ///
    /// Finished or idle projects become `Pending`; running ones are flagged
    /// to build again once their current build ends.
    pub fn mark_projects_and_consumers_pending(&mut self, dirty: &BTreeSet<ProjectId>) {
        let mut stack: Vec<ProjectId> = dirty.iter().copied().collect();
        let mut visited: HashSet<ProjectId> = HashSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let info = &mut self.projects[id.index()];
            match info.run_state {
                Some(RunState::Pending) => {}
                Some(RunState::Running) => {
                    if !info.rebuild_requested {
                        debug!(project = %info.name, "dirty while running; rebuild requested");
                    }
                    info.rebuild_requested = true;
                }
                None
                | Some(RunState::DoneSuccess)
                | Some(RunState::DoneFailed)
                | Some(RunState::Blocked) => {
                    info.run_state = Some(RunState::Pending);
                    debug!(project = %info.name, "marked Pending for this run");
                }
            }

            stack.extend(self.graph.consumers_of(id));
        }
    }

    /// Dependency satisfaction for the current run.
    ///
    /// A dependency that is not part of the run counts as satisfied unless
    /// its last finished build failed.
    pub fn dep_status(&self, info: &ProjectInfo) -> DepStatus {
        let mut status = DepStatus::Ready;
        for dep in &info.deps {
            let dep = &self.projects[dep.index()];
            match dep.run_state {
                Some(RunState::DoneSuccess) => {}
                Some(RunState::DoneFailed) | Some(RunState::Blocked) => return DepStatus::Blocked,
                Some(RunState::Pending) | Some(RunState::Running) => status = DepStatus::Waiting,
                None => {
                    if dep.last_build_failed() {
                        return DepStatus::Blocked;
                    }
                }
            }
        }
        status
    }

    /// Move every pending project whose dependencies can no longer succeed
    /// in this run to `Blocked`. Returns the newly blocked projects.
    pub fn mark_blocked_projects(&mut self) -> Vec<ProjectId> {
        let mut newly_blocked = Vec::new();

        loop {
            let blocked: Vec<ProjectId> = self
                .projects
                .iter()
                .filter(|info| {
                    info.run_state == Some(RunState::Pending)
                        && self.dep_status(info) == DepStatus::Blocked
                })
                .map(|info| info.id)
                .collect();

            if blocked.is_empty() {
                break;
            }

            for id in blocked {
                let info = &mut self.projects[id.index()];
                info.run_state = Some(RunState::Blocked);
                debug!(project = %info.name, "dependency failed; project blocked for this run");
                newly_blocked.push(id);
            }
        }

        newly_blocked
    }

    /// Pick pending projects whose dependencies are satisfied, up to the free
    /// capacity, highest critical path first. They are marked `Running`.
    pub fn collect_new_ready_builds(&mut self, parallelism: usize) -> Vec<ScheduledBuild> {
        let running = self.running_count();
        let capacity = parallelism.saturating_sub(running);
        if capacity == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(Reverse<usize>, ProjectId)> = self
            .projects
            .iter()
            .filter(|info| {
                info.run_state == Some(RunState::Pending)
                    && self.dep_status(info) == DepStatus::Ready
            })
            .map(|info| (Reverse(info.critical_path_length), info.id))
            .collect();
        candidates.sort();

        let run_id = self.current_run_id.unwrap_or(0);
        let mut ready = Vec::new();
        for (_, id) in candidates.into_iter().take(capacity) {
            let info = &mut self.projects[id.index()];
            let is_rebuild = info.last_successful_run.is_some() || info.last_failed_run.is_some();
            info!(
                project = %info.name,
                run_id,
                critical_path_length = info.critical_path_length,
                rebuild = is_rebuild,
                "dependencies satisfied; dispatching build"
            );
            info.run_state = Some(RunState::Running);
            ready.push(ScheduledBuild::new(self.graph, id, run_id));
        }

        ready
    }

    pub fn running_count(&self) -> usize {
        self.projects
            .iter()
            .filter(|info| info.run_state == Some(RunState::Running))
            .count()
    }

    /// Nothing pending and nothing running.
    pub fn all_projects_terminal(&self) -> bool {
        !self.projects.iter().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}
