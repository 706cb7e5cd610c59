// src/exec/task_runner.rs

//! Individual build worker: fingerprint check, process, fingerprint persist.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::{ProjectId, ScheduledBuild};
use crate::engine::{BuildOutcome, RuntimeEvent};
use crate::exec::context::BuildContext;
use crate::fingerprint::FreshnessCheck;

/// Run one build and report it to the runtime.
///
/// Every output line is sent as `BuildOutput` before the single
/// `BuildCompleted`, so the runtime sees this project's events in order.
pub async fn run_build(
    build: ScheduledBuild,
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let project = build.project;
    let outcome = match run_build_inner(&build, &ctx, &runtime_tx).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(project = %build.name, run_id = build.run_id, error = %err, "build execution error");
            if runtime_tx
                .send(RuntimeEvent::BuildOutput {
                    project,
                    line: format!("monowatch: {err:#}"),
                })
                .await
                .is_err()
            {
                debug!(project = %build.name, "runtime gone; dropping error output");
            }
            BuildOutcome::Failed(-1)
        }
    };

    if runtime_tx
        .send(RuntimeEvent::BuildCompleted { project, outcome })
        .await
        .is_err()
    {
        debug!(project = %build.name, "runtime gone; dropping completion");
    }
}

async fn run_build_inner(
    build: &ScheduledBuild,
    ctx: &Arc<BuildContext>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<BuildOutcome> {
    let check = check_freshness(build, ctx).await?;
    if check.as_ref().is_some_and(|c| c.up_to_date) {
        info!(project = %build.name, run_id = build.run_id, "inputs unchanged; skipping build");
        return Ok(BuildOutcome::Skipped);
    }

    let outcome = run_command(build, ctx, runtime_tx).await?;

    if outcome.is_success() {
        match check {
            Some(check) => persist_fingerprint(build, ctx, check).await?,
            None => warn!(
                project = %build.name,
                "no fingerprint computed; the next run will rebuild this project"
            ),
        }
    }

    Ok(outcome)
}

/// Compute the current fingerprint and compare it with the stored one.
///
/// `None` when the inputs could not be enumerated; the build then runs
/// unconditionally.
async fn check_freshness(
    build: &ScheduledBuild,
    ctx: &Arc<BuildContext>,
) -> Result<Option<FreshnessCheck>> {
    let ctx = Arc::clone(ctx);
    let id = build.project;
    let name = build.name.clone();
    let config_hash = build.config_hash.clone();

    let check = tokio::task::spawn_blocking(move || {
        let inputs = ctx.inputs(id)?;
        ctx.store
            .check(&name, &config_hash, &inputs, &ctx.fingerprint_path(id))
    })
    .await
    .context("fingerprint worker panicked")?;

    match check {
        Ok(check) => Ok(Some(check)),
        Err(err) => {
            warn!(project = %build.name, error = %err, "could not compute fingerprint");
            Ok(None)
        }
    }
}

async fn persist_fingerprint(
    build: &ScheduledBuild,
    ctx: &Arc<BuildContext>,
    check: FreshnessCheck,
) -> Result<()> {
    let ctx = Arc::clone(ctx);
    let id = build.project;
    let persisted = tokio::task::spawn_blocking(move || {
        let path = ctx.fingerprint_path(id);
        let result = ctx.store.persist(&check.current, &path);
        // Consumers hash this file as an input.
        ctx.tokens.invalidate(&path);
        result
    })
    .await
    .context("fingerprint worker panicked")?;

    if let Err(err) = persisted {
        warn!(
            project = %build.name,
            error = %err,
            "failed to write fingerprint; the next run will rebuild this project"
        );
    }
    Ok(())
}

async fn run_command(
    build: &ScheduledBuild,
    ctx: &BuildContext,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<BuildOutcome> {
    let folder = ctx.project_folder(build.project);
    let cwd = if ctx.fs.is_dir(&folder) {
        folder
    } else {
        ctx.repo_root.clone()
    };

    info!(
        project = %build.name,
        run_id = build.run_id,
        cmd = %build.cmd,
        cwd = ?cwd,
        "starting build process"
    );

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&build.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&build.cmd);
        c
    };

    cmd.current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning build process for project '{}'", build.name))?;

    let stdout = forward_lines(child.stdout.take(), build.project, runtime_tx);
    let stderr = forward_lines(child.stderr.take(), build.project, runtime_tx);
    let (status, (), ()) = tokio::join!(child.wait(), stdout, stderr);

    let status =
        status.with_context(|| format!("waiting for build process of project '{}'", build.name))?;
    let code = status.code().unwrap_or(-1);

    info!(
        project = %build.name,
        run_id = build.run_id,
        exit_code = code,
        success = status.success(),
        "build process exited"
    );

    Ok(if status.success() {
        BuildOutcome::Succeeded
    } else {
        BuildOutcome::Failed(code)
    })
}

/// Send every line of `reader` to the runtime until EOF.
async fn forward_lines<R>(
    reader: Option<R>,
    project: ProjectId,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if runtime_tx
                    .send(RuntimeEvent::BuildOutput { project, line })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Ok(None) => return,
            Err(err) => {
                debug!(project = ?project, error = %err, "stopped reading build output");
                return;
            }
        }
    }
}
