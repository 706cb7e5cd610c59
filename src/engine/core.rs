// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! [`CoreRuntime`] consumes [`RuntimeEvent`]s and produces [`CoreCommand`]s
//! for the IO shell (`engine::runtime::Runtime`). It owns every watch state,
//! liveness flag and terminal decision, so it can be tested without Tokio,
//! channels, the filesystem or processes.
//!
//! [`CoreCommand`]: crate::engine::CoreCommand

use std::sync::Arc;

use crate::dag::{ProjectGraph, ProjectId, Scheduler};
use crate::engine::collator::TerminalCollator;
use crate::engine::event_handlers::{
    handle_build_completion, handle_build_output, handle_build_request,
    handle_clear_reported_failures, handle_files_changed, CoreStep,
};
use crate::engine::liveness::{ProjectStates, WatchState};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::lookup::PathTrie;

/// What a session ended with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub blocked: Vec<String>,
}

impl SessionSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }
}

/// Pure core runtime state.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    states: ProjectStates,
    collator: TerminalCollator,
    index: PathTrie<ProjectId>,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(graph: Arc<ProjectGraph>, parallelism: usize, options: RuntimeOptions) -> Self {
        Self {
            scheduler: Scheduler::new(graph.clone(), parallelism),
            states: ProjectStates::new(graph.clone()),
            collator: TerminalCollator::new(graph.clone()),
            index: graph.path_index(),
            options,
        }
    }

    pub fn graph(&self) -> &Arc<ProjectGraph> {
        self.scheduler.graph()
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn states(&self) -> &ProjectStates {
        &self.states
    }

    pub fn collator(&self) -> &TerminalCollator {
        &self.collator
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::BuildRequested { projects } => handle_build_request(
                &mut self.scheduler,
                &mut self.states,
                &mut self.collator,
                &self.options,
                projects,
            ),
            RuntimeEvent::FilesChanged { paths } => handle_files_changed(
                &mut self.scheduler,
                &mut self.states,
                &mut self.collator,
                &self.index,
                &self.options,
                paths,
            ),
            RuntimeEvent::BuildOutput { project, line } => {
                handle_build_output(&self.states, &mut self.collator, project, line)
            }
            RuntimeEvent::BuildCompleted { project, outcome } => handle_build_completion(
                &mut self.scheduler,
                &mut self.states,
                &mut self.collator,
                &self.options,
                project,
                outcome,
            ),
            RuntimeEvent::ClearReportedFailures => {
                handle_clear_reported_failures(&self.states, &mut self.collator)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    /// Final state of every project that was built at least once.
    pub fn summary(&self) -> SessionSummary {
        let graph = self.graph();
        let mut summary = SessionSummary::default();
        for id in graph.ids() {
            let name = graph.name(id).to_string();
            match self.states.state(id) {
                WatchState::Succeeded => summary.succeeded.push(name),
                WatchState::Failed => summary.failed.push(name),
                WatchState::Start | WatchState::Building => {}
            }
        }
        summary.blocked = self
            .scheduler
            .blocked_projects()
            .into_iter()
            .map(|id| graph.name(id).to_string())
            .collect();
        summary
    }
}
