// tests/scheduler_properties.rs

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use proptest::prelude::*;
use monowatch::config::ConfigFile;
use monowatch::dag::{ProjectGraph, ProjectId, ScheduledBuild, Scheduler};
use monowatch::engine::BuildOutcome;
use monowatch_test_utils::builders::{ConfigFileBuilder, ProjectConfigBuilder};

// Acyclic by construction: project N may only depend on projects 0..N-1.
fn dag_config_strategy(max_projects: usize) -> impl Strategy<Value = ConfigFile> {
    (1..=max_projects).prop_flat_map(|count| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..3), count).prop_map(
            move |raw_deps| {
                let mut builder = ConfigFileBuilder::new();
                for (i, potential) in raw_deps.into_iter().enumerate() {
                    let name = format!("p{i:02}");
                    let mut project = ProjectConfigBuilder::new(&format!("dir{i:02}"), "make");
                    let deps: HashSet<usize> = if i == 0 {
                        HashSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    for dep in deps {
                        project = project.depends_on(&format!("p{dep:02}"));
                    }
                    builder = builder.with_project(&name, project.build());
                }
                builder.build()
            },
        )
    })
}

proptest! {
    #[test]
    fn every_run_terminates_and_respects_dependencies(
        cfg in dag_config_strategy(10),
        dirty_picks in proptest::collection::vec(any::<usize>(), 1..5),
        failing_picks in proptest::collection::vec(any::<usize>(), 0..3),
        parallelism in 1usize..4,
    ) {
        let graph = Arc::new(ProjectGraph::from_config(&cfg).unwrap());
        let ids: Vec<ProjectId> = graph.ids().collect();
        let dirty: BTreeSet<ProjectId> = dirty_picks.iter().map(|i| ids[i % ids.len()]).collect();
        let failing: HashSet<ProjectId> = failing_picks.iter().map(|i| ids[i % ids.len()]).collect();

        let mut scheduler = Scheduler::new(graph.clone(), parallelism);
        let mut running: VecDeque<ScheduledBuild> = VecDeque::new();
        let mut succeeded: HashSet<ProjectId> = HashSet::new();
        let mut built: Vec<ProjectId> = Vec::new();

        let step = scheduler.handle_dirty(&dirty);
        running.extend(step.newly_scheduled);

        let mut guard = 0;
        while let Some(build) = running.pop_front() {
            guard += 1;
            prop_assert!(guard <= 100, "scheduler did not settle");
            prop_assert!(running.len() < parallelism);

            // Every dependency in the run already succeeded.
            for dep in graph.dependencies_of(build.project) {
                let in_run = dirty.contains(&dep)
                    || dirty.iter().any(|d| graph.transitive_consumers(*d).contains(&dep));
                prop_assert!(!in_run || succeeded.contains(&dep));
            }

            built.push(build.project);
            let outcome = if failing.contains(&build.project) {
                BuildOutcome::Failed(1)
            } else {
                succeeded.insert(build.project);
                BuildOutcome::Succeeded
            };
            let step = scheduler.handle_completion(build.project, outcome);
            running.extend(step.newly_scheduled);
        }

        prop_assert!(scheduler.is_idle());

        // Without new changes nothing builds twice.
        let unique: HashSet<_> = built.iter().collect();
        prop_assert_eq!(unique.len(), built.len());

        // Consumers of a failure were blocked, not built.
        for id in scheduler.blocked_projects() {
            prop_assert!(!built.contains(&id));
        }
    }
}
