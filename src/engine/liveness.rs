// src/engine/liveness.rs

//! Per-project watch state and liveness.
//!
//! A project is live when every dependency, transitively, has succeeded and
//! is itself live. Projects without dependencies are always live. Liveness
//! is maintained incrementally on each state transition: a rebuild kills
//! everything downstream, a success re-lights consumers whose dependencies
//! are all live successes again.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::dag::{ProjectGraph, ProjectId};

/// Watch state of one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Start,
    Building,
    Succeeded,
    Failed,
}

/// What a state transition did to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChange {
    pub newly_dead: Vec<ProjectId>,
    pub newly_live: Vec<ProjectId>,
}

/// Watch state and liveness of every project in a graph.
#[derive(Debug, Clone)]
pub struct ProjectStates {
    graph: Arc<ProjectGraph>,
    states: Vec<WatchState>,
    live: Vec<bool>,
}

impl ProjectStates {
    pub fn new(graph: Arc<ProjectGraph>) -> Self {
        let live = graph
            .ids()
            .map(|id| graph.dependencies_of(id).is_empty())
            .collect();
        Self {
            states: vec![WatchState::Start; graph.len()],
            live,
            graph,
        }
    }

    pub fn graph(&self) -> &Arc<ProjectGraph> {
        &self.graph
    }

    pub fn state(&self, id: ProjectId) -> WatchState {
        self.states[id.index()]
    }

    pub fn is_live(&self, id: ProjectId) -> bool {
        self.live[id.index()]
    }

    /// Move `id` to `next` and propagate liveness.
    pub fn transition(&mut self, id: ProjectId, next: WatchState) -> StateChange {
        let previous = self.states[id.index()];
        self.states[id.index()] = next;
        trace!(project = %self.graph.name(id), ?previous, ?next, "watch state transition");

        let mut change = StateChange::default();
        match next {
            WatchState::Building if previous == WatchState::Succeeded && self.is_live(id) => {
                change.newly_dead = self.mark_consumers_dead(id);
            }
            WatchState::Succeeded if self.is_live(id) => {
                change.newly_live = self.light_consumers(id);
            }
            _ => {}
        }

        if !change.newly_dead.is_empty() || !change.newly_live.is_empty() {
            debug!(
                project = %self.graph.name(id),
                dead = ?self.names(&change.newly_dead),
                live = ?self.names(&change.newly_live),
                "liveness changed"
            );
        }
        change
    }

    /// Every project downstream of `id` stops being live. The walk does not
    /// continue past projects that are already dead.
    fn mark_consumers_dead(&mut self, id: ProjectId) -> Vec<ProjectId> {
        let mut newly_dead = Vec::new();
        let mut stack = self.graph.consumers_of(id);

        while let Some(next) = stack.pop() {
            if !self.live[next.index()] {
                continue;
            }
            self.live[next.index()] = false;
            newly_dead.push(next);
            stack.extend(self.graph.consumers_of(next));
        }

        newly_dead
    }

    /// Light consumers of a live success, continuing through consumers that
    /// have already succeeded.
    fn light_consumers(&mut self, id: ProjectId) -> Vec<ProjectId> {
        let mut newly_live = Vec::new();
        let mut stack = self.graph.consumers_of(id);

        while let Some(next) = stack.pop() {
            if self.live[next.index()] || !self.all_deps_live_successes(next) {
                continue;
            }
            self.live[next.index()] = true;
            newly_live.push(next);
            if self.states[next.index()] == WatchState::Succeeded {
                stack.extend(self.graph.consumers_of(next));
            }
        }

        newly_live
    }

    fn all_deps_live_successes(&self, id: ProjectId) -> bool {
        self.graph.dependencies_of(id).into_iter().all(|dep| {
            self.states[dep.index()] == WatchState::Succeeded && self.live[dep.index()]
        })
    }

    fn names(&self, ids: &[ProjectId]) -> Vec<&str> {
        ids.iter().map(|id| self.graph.name(*id)).collect()
    }
}
