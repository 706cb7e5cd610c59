// tests/changed_files.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, ProjectConfigBuilder};
use crate::common::{dispatched, graph_of, id, init_tracing, terminal_lines};

use std::collections::BTreeSet;

use monowatch::engine::{BuildOutcome, CoreRuntime, RuntimeEvent, RuntimeOptions};

#[test]
fn build_output_in_excluded_folder_does_not_restart_the_project() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_project("lib", ProjectConfigBuilder::new("lib", "make").exclude("dist/**").build())
        .with_project("app", ProjectConfigBuilder::new("app", "make").depends_on("lib").build())
        .build();
    let graph = graph_of(&cfg);
    let (lib, app) = (id(&graph, "lib"), id(&graph, "app"));
    let mut core = CoreRuntime::new(
        graph.clone(),
        2,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );

    core.step(RuntimeEvent::BuildRequested {
        projects: BTreeSet::from([lib]),
    });
    core.step(RuntimeEvent::BuildCompleted {
        project: lib,
        outcome: BuildOutcome::Succeeded,
    });
    core.step(RuntimeEvent::BuildCompleted {
        project: app,
        outcome: BuildOutcome::Succeeded,
    });
    assert!(core.states().is_live(app));

    let step = core.step(RuntimeEvent::FilesChanged {
        paths: vec!["lib/dist/out.js".to_string(), "lib/dist/maps/out.js.map".to_string()],
    });
    assert!(dispatched(&step).is_empty());
    assert!(terminal_lines(&step).is_empty());
    assert!(core.states().is_live(app));

    // A real source edit still rebuilds.
    let step = core.step(RuntimeEvent::FilesChanged {
        paths: vec!["lib/src/index.ts".to_string()],
    });
    assert_eq!(dispatched(&step), vec!["lib"]);
    assert!(!core.states().is_live(app));
}
