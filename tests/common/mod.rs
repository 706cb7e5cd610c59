#![allow(dead_code)]

use std::sync::Arc;

use monowatch::config::ConfigFile;
use monowatch::dag::{ProjectGraph, ProjectId};
use monowatch::engine::{CoreCommand, CoreStep, TerminalLine};

pub use monowatch_test_utils::builders;
pub use monowatch_test_utils::{init_tracing, with_timeout};

pub fn graph_of(cfg: &ConfigFile) -> Arc<ProjectGraph> {
    Arc::new(ProjectGraph::from_config(cfg).expect("config should form a DAG"))
}

pub fn id(graph: &ProjectGraph, name: &str) -> ProjectId {
    graph
        .id_of(name)
        .unwrap_or_else(|| panic!("unknown project {name}"))
}

/// Every terminal line a core step asked to write, rendered.
pub fn terminal_lines(step: &CoreStep) -> Vec<String> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::WriteTerminal(lines) => Some(lines.iter().map(TerminalLine::to_string)),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Names of the projects a core step dispatched.
pub fn dispatched(step: &CoreStep) -> Vec<String> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchBuilds(builds) => Some(builds.iter().map(|b| b.name.clone())),
            _ => None,
        })
        .flatten()
        .collect()
}
