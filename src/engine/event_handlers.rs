// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::dag::{ProjectId, ScheduledBuild, Scheduler, SchedulerStep};
use crate::engine::collator::{TerminalCollator, TerminalLine};
use crate::engine::liveness::{ProjectStates, WatchState};
use crate::engine::{BuildOutcome, RuntimeOptions};
use crate::lookup::PathTrie;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these builds to the executor.
    DispatchBuilds(Vec<ScheduledBuild>),
    /// Write these lines to the shared terminal, in order.
    WriteTerminal(Vec<TerminalLine>),
    /// Request that the process exits (used for `--once` when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Collects terminal lines and dispatches while one event is handled.
#[derive(Debug, Default)]
struct Commands {
    terminal: Vec<TerminalLine>,
    dispatch: Vec<ScheduledBuild>,
}

impl Commands {
    fn into_vec(self) -> Vec<CoreCommand> {
        let mut commands = Vec::new();
        if !self.terminal.is_empty() {
            commands.push(CoreCommand::WriteTerminal(self.terminal));
        }
        if !self.dispatch.is_empty() {
            commands.push(CoreCommand::DispatchBuilds(self.dispatch));
        }
        commands
    }
}

/// Changed files: resolve their owning projects and mark them dirty.
///
/// Paths matching the owner's exclude globs (its own build output, for
/// instance) dirty nothing.
pub fn handle_files_changed(
    scheduler: &mut Scheduler,
    states: &mut ProjectStates,
    collator: &mut TerminalCollator,
    index: &PathTrie<ProjectId>,
    options: &RuntimeOptions,
    paths: Vec<String>,
) -> CoreStep {
    let graph = states.graph().clone();
    let dirty = graph.dirty_projects(index, paths.iter());
    if dirty.is_empty() {
        debug!(files = paths.len(), "changed files belong to no project");
        return finish_step(scheduler, options, Commands::default());
    }
    handle_build_request(scheduler, states, collator, options, dirty)
}

/// Explicit build request for a set of projects.
pub fn handle_build_request(
    scheduler: &mut Scheduler,
    states: &mut ProjectStates,
    collator: &mut TerminalCollator,
    options: &RuntimeOptions,
    projects: BTreeSet<ProjectId>,
) -> CoreStep {
    let mut commands = Commands::default();
    let step = scheduler.handle_dirty(&projects);
    apply_scheduler_step(scheduler, states, collator, step, &mut commands);
    finish_step(scheduler, options, commands)
}

/// One output line of a running build.
pub fn handle_build_output(
    states: &ProjectStates,
    collator: &mut TerminalCollator,
    project: ProjectId,
    line: String,
) -> CoreStep {
    let commands = Commands {
        terminal: collator.line(project, line, states),
        dispatch: Vec::new(),
    };
    CoreStep::running(commands.into_vec())
}

/// A build finished: update watch state, terminal and scheduling.
pub fn handle_build_completion(
    scheduler: &mut Scheduler,
    states: &mut ProjectStates,
    collator: &mut TerminalCollator,
    options: &RuntimeOptions,
    project: ProjectId,
    outcome: BuildOutcome,
) -> CoreStep {
    let mut commands = Commands::default();

    let next = if outcome.is_success() {
        WatchState::Succeeded
    } else {
        WatchState::Failed
    };
    match outcome {
        BuildOutcome::Failed(code) => {
            warn!(project = %states.graph().name(project), exit_code = code, "build failed")
        }
        _ => info!(project = %states.graph().name(project), ?outcome, "build finished"),
    }
    states.transition(project, next);
    commands
        .terminal
        .extend(collator.build_finished(project, outcome, states));

    let step = scheduler.handle_completion(project, outcome);
    apply_scheduler_step(scheduler, states, collator, step, &mut commands);
    finish_step(scheduler, options, commands)
}

/// Forget reported failures so buffered successes can flush.
pub fn handle_clear_reported_failures(
    states: &ProjectStates,
    collator: &mut TerminalCollator,
) -> CoreStep {
    let commands = Commands {
        terminal: collator.clear_reported_failures(states),
        dispatch: Vec::new(),
    };
    CoreStep::running(commands.into_vec())
}

/// Every newly scheduled project enters `Building` before dispatch.
fn apply_scheduler_step(
    scheduler: &Scheduler,
    states: &mut ProjectStates,
    collator: &mut TerminalCollator,
    step: SchedulerStep,
    commands: &mut Commands,
) {
    for id in &step.newly_blocked {
        warn!(
            project = %scheduler.graph().name(*id),
            "not building: a dependency failed"
        );
    }

    for build in &step.newly_scheduled {
        states.transition(build.project, WatchState::Building);
        commands
            .terminal
            .extend(collator.build_started(build.project, states));
    }
    commands.dispatch.extend(step.newly_scheduled);
}

/// In `--once` mode, exit when nothing is pending or running.
fn finish_step(scheduler: &Scheduler, options: &RuntimeOptions, commands: Commands) -> CoreStep {
    let mut commands = commands.into_vec();
    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }
    CoreStep {
        commands,
        keep_running,
    }
}
