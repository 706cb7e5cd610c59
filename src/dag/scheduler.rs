// src/dag/scheduler.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::{ProjectGraph, ProjectId};
use crate::dag::project_info::{ProjectInfo, ProjectRunState, RunState};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::engine::BuildOutcome;

/// Scheduler holds the immutable project graph plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which projects are part of the current run
/// - deciding when a dirty project is ready to build
/// - blocking consumers of failed projects
/// - re-queueing projects that became dirty while building
///
/// A run starts with the first dirty set seen while idle and ends once no
/// project is pending or running. Dirty sets arriving mid-run are merged
/// into the active run.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<ProjectGraph>,
    projects: Vec<ProjectInfo>,
    parallelism: usize,
    run_counter: u64,
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn new(graph: Arc<ProjectGraph>, parallelism: usize) -> Self {
        let projects = graph
            .ids()
            .map(|id| ProjectInfo::from_graph(&graph, id))
            .collect();

        Self {
            graph,
            projects,
            parallelism: parallelism.max(1),
            run_counter: 0,
            current_run_id: None,
        }
    }

    pub fn graph(&self) -> &Arc<ProjectGraph> {
        &self.graph
    }

    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn run_state_of(&self, id: ProjectId) -> Option<ProjectRunState> {
        self.projects.get(id.index()).map(|info| info.run_state.into())
    }

    pub fn running_count(&self) -> usize {
        self.projects
            .iter()
            .filter(|info| info.run_state == Some(RunState::Running))
            .count()
    }

    /// Projects whose most recent build failed.
    pub fn failed_projects(&self) -> Vec<ProjectId> {
        self.projects
            .iter()
            .filter(|info| info.last_build_failed())
            .map(|info| info.id)
            .collect()
    }

    /// Projects blocked in the current (or last) run.
    pub fn blocked_projects(&self) -> Vec<ProjectId> {
        self.projects
            .iter()
            .filter(|info| info.run_state == Some(RunState::Blocked))
            .map(|info| info.id)
            .collect()
    }

    /// Mark `dirty` and all their consumers as needing a build.
    pub fn handle_dirty(&mut self, dirty: &BTreeSet<ProjectId>) -> SchedulerStep {
        if dirty.is_empty() {
            return SchedulerStep::default();
        }

        if self.current_run_id.is_none() {
            self.start_new_run();
        }

        let names: Vec<&str> = dirty.iter().map(|id| self.graph.name(*id)).collect();
        info!(run_id = self.current_run_id, projects = ?names, "projects marked dirty");

        let mut manager = self.manager();
        manager.mark_projects_and_consumers_pending(dirty);
        self.advance()
    }

    /// Record a finished build and schedule whatever it unblocked.
    pub fn handle_completion(&mut self, id: ProjectId, outcome: BuildOutcome) -> SchedulerStep {
        let run_id = match self.current_run_id {
            Some(run_id) => run_id,
            None => {
                warn!(project = ?id, "completion with no active run; ignoring");
                return SchedulerStep::default();
            }
        };

        let Some(info) = self.projects.get_mut(id.index()) else {
            warn!(project = ?id, "completion for unknown project; ignoring");
            return SchedulerStep::default();
        };

        if info.run_state != Some(RunState::Running) {
            warn!(project = %info.name, state = ?info.run_state, "completion for a project that is not running");
        }

        if outcome.is_success() {
            info.last_successful_run = Some(run_id);
            info.run_state = Some(RunState::DoneSuccess);
        } else {
            info.last_failed_run = Some(run_id);
            info.run_state = Some(RunState::DoneFailed);
        }
        debug!(project = %info.name, run_id, ?outcome, "build finished");

        if info.rebuild_requested {
            info.rebuild_requested = false;
            info.run_state = Some(RunState::Pending);
            info!(project = %info.name, run_id, "re-queueing project that changed while building");
        }

        self.advance()
    }

    fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in &mut self.projects {
            info.run_state = None;
            info.rebuild_requested = false;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Block what can no longer build, dispatch what can, and close the run
    /// when nothing is left.
    fn advance(&mut self) -> SchedulerStep {
        let parallelism = self.parallelism;
        let mut manager = self.manager();
        let newly_blocked = manager.mark_blocked_projects();
        let newly_scheduled = manager.collect_new_ready_builds(parallelism);
        let finished = manager.all_projects_terminal();

        let run_just_finished = finished && self.current_run_id.is_some();
        if run_just_finished {
            info!(run_id = self.current_run_id, "scheduler: run finished");
            self.current_run_id = None;
        }

        SchedulerStep {
            newly_scheduled,
            newly_blocked,
            run_just_finished,
        }
    }

    fn manager(&mut self) -> StateManager<'_> {
        StateManager::new(&self.graph, &mut self.projects, self.current_run_id)
    }
}
