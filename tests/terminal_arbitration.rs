// tests/terminal_arbitration.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, ProjectConfigBuilder};
use crate::common::{dispatched, graph_of, id, init_tracing, terminal_lines};

use std::collections::BTreeSet;

use monowatch::engine::{BuildOutcome, CoreRuntime, RuntimeEvent, RuntimeOptions};

fn watch_options() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: false,
    }
}

fn output(project: monowatch::dag::ProjectId, line: &str) -> RuntimeEvent {
    RuntimeEvent::BuildOutput {
        project,
        line: line.to_string(),
    }
}

/// Three independent projects building at the same time.
#[test]
fn reported_failure_holds_back_successes_but_not_failures() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_project("X", ProjectConfigBuilder::new("x", "make").build())
        .with_project("Y", ProjectConfigBuilder::new("y", "make").build())
        .with_project("Z", ProjectConfigBuilder::new("z", "make").build())
        .build();
    let graph = graph_of(&cfg);
    let (x, y, z) = (id(&graph, "X"), id(&graph, "Y"), id(&graph, "Z"));
    let mut core = CoreRuntime::new(graph.clone(), 4, watch_options());

    let step = core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([x, y, z]),
    });
    assert_eq!(dispatched(&step), vec!["X", "Y", "Z"]);
    assert_eq!(terminal_lines(&step), vec!["==[ X ]== building"]);
    assert_eq!(core.collator().active(), Some(x));

    // Buffered, not shown.
    assert!(terminal_lines(&core.step(output(y, "y says hi"))).is_empty());
    assert!(terminal_lines(&core.step(output(z, "z says hi"))).is_empty());
    assert_eq!(terminal_lines(&core.step(output(x, "x: error"))), vec!["x: error"]);

    let step = core.step(RuntimeEvent::BuildCompleted {
        project: x,
        outcome: BuildOutcome::Failed(1),
    });
    assert_eq!(terminal_lines(&step), vec!["==[ X ]== failed"]);
    assert!(core.collator().reported_failures().contains(&x));
    assert_eq!(core.collator().active(), None, "nothing attaches while X's failure is shown");

    // Y's success stays buffered behind X's failure.
    let step = core.step(RuntimeEvent::BuildCompleted {
        project: y,
        outcome: BuildOutcome::Succeeded,
    });
    assert!(terminal_lines(&step).is_empty());

    // Z's failure is still surfaced.
    let step = core.step(RuntimeEvent::BuildCompleted {
        project: z,
        outcome: BuildOutcome::Failed(2),
    });
    assert_eq!(
        terminal_lines(&step),
        vec!["==[ Z ]== building", "z says hi", "==[ Z ]== failed"]
    );

    // Clearing reported failures lets the buffered success through.
    let step = core.step(RuntimeEvent::ClearReportedFailures);
    assert_eq!(
        terminal_lines(&step),
        vec!["==[ Y ]== building", "y says hi", "==[ Y ]== succeeded"]
    );
    assert!(step.keep_running);
}

#[test]
fn fixing_the_reported_failure_releases_buffered_successes() {
    let cfg = ConfigFileBuilder::new()
        .with_project("X", ProjectConfigBuilder::new("x", "make").build())
        .with_project("Y", ProjectConfigBuilder::new("y", "make").build())
        .build();
    let graph = graph_of(&cfg);
    let (x, y) = (id(&graph, "X"), id(&graph, "Y"));
    let mut core = CoreRuntime::new(graph.clone(), 4, watch_options());

    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([x, y]),
    });
    core.step(RuntimeEvent::BuildCompleted {
        project: x,
        outcome: BuildOutcome::Failed(1),
    });
    let step = core.step(RuntimeEvent::BuildCompleted {
        project: y,
        outcome: BuildOutcome::Succeeded,
    });
    assert!(terminal_lines(&step).is_empty());

    // X is rebuilt and fixed.
    let step = core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([x]),
    });
    assert_eq!(dispatched(&step), vec!["X"]);

    let step = core.step(RuntimeEvent::BuildCompleted {
        project: x,
        outcome: BuildOutcome::Succeeded,
    });
    let lines = terminal_lines(&step);
    assert_eq!(lines.first().map(String::as_str), Some("==[ X ]== succeeded"));
    assert!(lines.contains(&"==[ Y ]== succeeded".to_string()), "{lines:?}");
    assert!(core.collator().reported_failures().is_empty());
}

#[test]
fn active_project_is_interrupted_when_its_dependency_rebuilds() {
    let cfg = ConfigFileBuilder::new()
        .with_project("lib", ProjectConfigBuilder::new("lib", "make").build())
        .with_project("app", ProjectConfigBuilder::new("app", "make").depends_on("lib").build())
        .with_project("tool", ProjectConfigBuilder::new("tool", "make").build())
        .build();
    let graph = graph_of(&cfg);
    let (lib, app, tool) = (id(&graph, "lib"), id(&graph, "app"), id(&graph, "tool"));
    let mut core = CoreRuntime::new(graph.clone(), 4, watch_options());

    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([lib]),
    });
    let step = core.step(RuntimeEvent::BuildCompleted {
        project: lib,
        outcome: BuildOutcome::Succeeded,
    });
    assert_eq!(dispatched(&step), vec!["app"]);
    assert_eq!(core.collator().active(), Some(app));

    // lib changes again while app is still building: app goes dead.
    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([lib, tool]),
    });
    assert!(!core.states().is_live(app));

    // Output of another project detaches the dead app.
    let step = core.step(output(tool, "tool output"));
    let lines = terminal_lines(&step);
    assert_eq!(lines[0], "==[ app ]== interrupted (dependency rebuilding)");
    assert_ne!(core.collator().active(), Some(app));
}

#[test]
fn up_to_date_builds_are_reported_as_such() {
    let cfg = ConfigFileBuilder::new()
        .with_project("A", ProjectConfigBuilder::new("a", "make").build())
        .build();
    let graph = graph_of(&cfg);
    let a = id(&graph, "A");
    let mut core = CoreRuntime::new(
        graph.clone(),
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );

    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([a]),
    });
    let step = core.step(RuntimeEvent::BuildCompleted {
        project: a,
        outcome: BuildOutcome::Skipped,
    });
    assert_eq!(terminal_lines(&step), vec!["==[ A ]== up to date"]);
    assert!(!step.keep_running);
}

#[test]
fn shortest_critical_path_attaches_when_active_project_finishes() {
    let cfg = ConfigFileBuilder::new()
        .with_project("aaa", ProjectConfigBuilder::new("aaa", "make").build())
        .with_project("lib", ProjectConfigBuilder::new("lib", "make").build())
        .with_project("tool", ProjectConfigBuilder::new("tool", "make").build())
        .with_project("zapp", ProjectConfigBuilder::new("zapp", "make").depends_on("lib").build())
        .build();
    let graph = graph_of(&cfg);
    let (aaa, lib, tool) = (id(&graph, "aaa"), id(&graph, "lib"), id(&graph, "tool"));
    assert_eq!(graph.critical_path_length(lib), 1);
    assert_eq!(graph.critical_path_length(tool), 0);
    assert!(lib < tool);
    let mut core = CoreRuntime::new(graph.clone(), 4, watch_options());

    let step = core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([aaa, lib, tool]),
    });
    let mut started = dispatched(&step);
    started.sort();
    assert_eq!(started, vec!["aaa", "lib", "tool"]);
    assert_eq!(core.collator().active(), Some(aaa));

    assert!(terminal_lines(&core.step(output(tool, "tool output"))).is_empty());

    let step = core.step(RuntimeEvent::BuildCompleted {
        project: aaa,
        outcome: BuildOutcome::Succeeded,
    });
    assert_eq!(
        terminal_lines(&step),
        vec!["==[ aaa ]== succeeded", "==[ tool ]== building", "tool output"]
    );
    assert_eq!(core.collator().active(), Some(tool));
}

#[test]
fn dead_building_project_is_never_attached() {
    let cfg = ConfigFileBuilder::new()
        .with_project("aaa", ProjectConfigBuilder::new("aaa", "make").build())
        .with_project("app", ProjectConfigBuilder::new("app", "make").depends_on("base").build())
        .with_project("base", ProjectConfigBuilder::new("base", "make").build())
        .with_project("tool", ProjectConfigBuilder::new("tool", "make").build())
        .build();
    let graph = graph_of(&cfg);
    let (aaa, app, base, tool) = (
        id(&graph, "aaa"),
        id(&graph, "app"),
        id(&graph, "base"),
        id(&graph, "tool"),
    );
    let mut core = CoreRuntime::new(graph.clone(), 4, watch_options());

    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([base]),
    });
    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([aaa, tool]),
    });
    assert_eq!(core.collator().active(), Some(base));

    let step = core.step(RuntimeEvent::BuildCompleted {
        project: base,
        outcome: BuildOutcome::Succeeded,
    });
    assert_eq!(dispatched(&step), vec!["app"]);
    assert_eq!(core.collator().active(), Some(aaa));
    assert!(core.states().is_live(app));

    // base changes again while app builds: app is now dead.
    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([base]),
    });
    assert!(!core.states().is_live(app));

    // app would win on (critical path, id) but is skipped.
    let step = core.step(RuntimeEvent::BuildCompleted {
        project: aaa,
        outcome: BuildOutcome::Succeeded,
    });
    assert_eq!(
        terminal_lines(&step),
        vec!["==[ aaa ]== succeeded", "==[ tool ]== building"]
    );
    assert_eq!(core.collator().active(), Some(tool));
}
