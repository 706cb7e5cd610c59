// src/exec/executor_loop.rs

//! Background loop that turns scheduled builds into worker tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::{ProjectId, ScheduledBuild};
use crate::engine::RuntimeEvent;
use crate::exec::context::BuildContext;
use crate::exec::task_runner::run_build;

/// Spawn the background executor loop.
///
/// Each scheduled build runs in its own Tokio task. The scheduler never
/// dispatches a project that is still running; a duplicate is logged and
/// started anyway, since its events are still ordered per project.
pub fn spawn_executor(
    context: BuildContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledBuild> {
    let (tx, mut rx) = mpsc::channel::<ScheduledBuild>(32);
    let context = Arc::new(context);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<ProjectId, JoinHandle<()>> = HashMap::new();

        while let Some(build) = rx.recv().await {
            active.retain(|_, handle| !handle.is_finished());

            if active.contains_key(&build.project) {
                warn!(
                    project = %build.name,
                    run_id = build.run_id,
                    "project dispatched while a previous build is still running"
                );
            }

            let project = build.project;
            let name = build.name.clone();
            let ctx = Arc::clone(&context);
            let rt_tx = runtime_tx.clone();
            let handle = tokio::spawn(async move {
                run_build(build, ctx, rt_tx).await;
                debug!(project = %name, "build worker finished");
            });
            active.insert(project, handle);
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
