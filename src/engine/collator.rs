// src/engine/collator.rs

//! Arbitration of the shared terminal between concurrently building
//! projects.
//!
//! At most one project is attached to the terminal at a time; everything
//! else is buffered. When the attached project finishes, buffered failures
//! are shown first, then buffered successes oldest-first, then the live
//! building project with the shortest critical path is attached. While a
//! reported failure is on screen, successes stay buffered and only a rebuild
//! of a reported failure may attach.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dag::{ProjectGraph, ProjectId};
use crate::engine::BuildOutcome;
use crate::engine::liveness::{ProjectStates, WatchState};

/// Completion verdict shown in the terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Succeeded,
    UpToDate,
    Failed,
}

impl From<BuildOutcome> for Verdict {
    fn from(outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::Succeeded => Verdict::Succeeded,
            BuildOutcome::Skipped => Verdict::UpToDate,
            BuildOutcome::Failed(_) => Verdict::Failed,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Succeeded => "succeeded",
            Verdict::UpToDate => "up to date",
            Verdict::Failed => "failed",
        })
    }
}

/// One line written to the shared terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalLine {
    /// A project's output is attached from here on.
    Building { project: String },
    Output { project: String, line: String },
    /// The attached project lost liveness and was detached.
    Interrupted { project: String },
    Completed { project: String, verdict: Verdict },
}

impl fmt::Display for TerminalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalLine::Building { project } => write!(f, "==[ {project} ]== building"),
            TerminalLine::Output { line, .. } => f.write_str(line),
            TerminalLine::Interrupted { project } => {
                write!(f, "==[ {project} ]== interrupted (dependency rebuilding)")
            }
            TerminalLine::Completed { project, verdict } => write!(f, "==[ {project} ]== {verdict}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ProjectOutput {
    lines: Vec<String>,
    /// Lines before this index were already written.
    written: usize,
    /// Completion marker written; nothing left to show.
    reported: bool,
    verdict: Option<Verdict>,
    /// Order in which builds finished, for oldest-first flushing.
    finished_seq: Option<u64>,
}

/// Decides which project owns the terminal.
#[derive(Debug)]
pub struct TerminalCollator {
    graph: Arc<ProjectGraph>,
    outputs: Vec<ProjectOutput>,
    active: Option<ProjectId>,
    reported_failures: BTreeSet<ProjectId>,
    finish_counter: u64,
}

impl TerminalCollator {
    pub fn new(graph: Arc<ProjectGraph>) -> Self {
        Self {
            outputs: vec![ProjectOutput::default(); graph.len()],
            graph,
            active: None,
            reported_failures: BTreeSet::new(),
            finish_counter: 0,
        }
    }

    pub fn active(&self) -> Option<ProjectId> {
        self.active
    }

    pub fn reported_failures(&self) -> &BTreeSet<ProjectId> {
        &self.reported_failures
    }

    /// A new build of `id` started: drop whatever it buffered before.
    pub fn build_started(&mut self, id: ProjectId, states: &ProjectStates) -> Vec<TerminalLine> {
        self.outputs[id.index()] = ProjectOutput::default();
        if self.active == Some(id) {
            self.active = None;
        }
        self.arbitrate(states)
    }

    /// One output line of `id`.
    pub fn line(&mut self, id: ProjectId, line: String, states: &ProjectStates) -> Vec<TerminalLine> {
        let mut out = Vec::new();
        let output = &mut self.outputs[id.index()];
        output.lines.push(line);

        if self.active == Some(id) {
            out.extend(self.write_pending_lines(id));
            return out;
        }

        if let Some(active) = self.active {
            if !states.is_live(active) {
                debug!(project = %self.graph.name(active), "detaching project that is no longer live");
                out.push(TerminalLine::Interrupted {
                    project: self.graph.name(active).to_string(),
                });
                self.active = None;
            }
        }

        out.extend(self.arbitrate(states));
        out
    }

    /// The build of `id` ended; `states` already holds its terminal state.
    pub fn build_finished(
        &mut self,
        id: ProjectId,
        outcome: BuildOutcome,
        states: &ProjectStates,
    ) -> Vec<TerminalLine> {
        self.finish_counter += 1;
        let output = &mut self.outputs[id.index()];
        output.verdict = Some(outcome.into());
        output.finished_seq = Some(self.finish_counter);

        if outcome.is_success() && self.reported_failures.remove(&id) {
            debug!(project = %self.graph.name(id), "previously reported failure is fixed");
        }

        let mut out = Vec::new();
        if self.active == Some(id) {
            self.active = None;
            out.extend(self.write_pending_lines(id));
            out.push(self.complete(id, states));
        }
        out.extend(self.arbitrate(states));
        out
    }

    /// Forget every reported failure.
    pub fn clear_reported_failures(&mut self, states: &ProjectStates) -> Vec<TerminalLine> {
        if !self.reported_failures.is_empty() {
            debug!(count = self.reported_failures.len(), "clearing reported failures");
        }
        self.reported_failures.clear();
        self.arbitrate(states)
    }

    /// Attach or flush projects until the terminal is busy or nothing
    /// qualifies.
    pub fn arbitrate(&mut self, states: &ProjectStates) -> Vec<TerminalLine> {
        let mut out = Vec::new();

        while self.active.is_none() {
            if let Some(id) = self.oldest_unreported(states, WatchState::Failed) {
                out.extend(self.flush_finished(id, states));
                continue;
            }

            let failure_on_screen = self.failure_on_screen(states);
            if !failure_on_screen {
                if let Some(id) = self.oldest_unreported(states, WatchState::Succeeded) {
                    out.extend(self.flush_finished(id, states));
                    continue;
                }
            }

            // While a failure is on screen only its own rebuild may attach.
            match self.next_building(states, failure_on_screen) {
                Some(id) => {
                    debug!(project = %self.graph.name(id), "attaching project to terminal");
                    self.active = Some(id);
                    out.push(TerminalLine::Building {
                        project: self.graph.name(id).to_string(),
                    });
                    out.extend(self.write_pending_lines(id));
                }
                None => break,
            }
        }

        out
    }

    /// A live failure was reported and has not been fixed or cleared.
    fn failure_on_screen(&self, states: &ProjectStates) -> bool {
        self.reported_failures.iter().any(|id| states.is_live(*id))
    }

    fn oldest_unreported(&self, states: &ProjectStates, wanted: WatchState) -> Option<ProjectId> {
        self.graph
            .ids()
            .filter(|id| {
                let output = &self.outputs[id.index()];
                states.state(*id) == wanted
                    && states.is_live(*id)
                    && !output.reported
                    && output.finished_seq.is_some()
            })
            .min_by_key(|id| self.outputs[id.index()].finished_seq)
    }

    fn next_building(&self, states: &ProjectStates, only_reported: bool) -> Option<ProjectId> {
        self.graph
            .ids()
            .filter(|id| states.state(*id) == WatchState::Building && states.is_live(*id))
            .filter(|id| !only_reported || self.reported_failures.contains(id))
            .min_by_key(|id| (self.graph.critical_path_length(*id), *id))
    }

    fn flush_finished(&mut self, id: ProjectId, states: &ProjectStates) -> Vec<TerminalLine> {
        let mut out = vec![TerminalLine::Building {
            project: self.graph.name(id).to_string(),
        }];
        out.extend(self.write_pending_lines(id));
        out.push(self.complete(id, states));
        out
    }

    fn complete(&mut self, id: ProjectId, states: &ProjectStates) -> TerminalLine {
        let output = &mut self.outputs[id.index()];
        output.reported = true;
        let verdict = output.verdict.unwrap_or(Verdict::Failed);

        if verdict == Verdict::Failed && states.is_live(id) {
            self.reported_failures.insert(id);
        }

        TerminalLine::Completed {
            project: self.graph.name(id).to_string(),
            verdict,
        }
    }

    fn write_pending_lines(&mut self, id: ProjectId) -> Vec<TerminalLine> {
        let project = self.graph.name(id).to_string();
        let output = &mut self.outputs[id.index()];
        let lines = output.lines[output.written..]
            .iter()
            .map(|line| TerminalLine::Output {
                project: project.clone(),
                line: line.clone(),
            })
            .collect();
        output.written = output.lines.len();
        lines
    }
}
