// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fingerprint;
pub mod fs;
pub mod logging;
pub mod lookup;
pub mod watch;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::dag::{ProjectGraph, ProjectId};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::{BuildContext, ShellExecutor};
use crate::fingerprint::VersionTokenCache;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{spawn_watcher, WatchOptions, DEFAULT_DEBOUNCE};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the project graph (a cycle aborts here)
/// - the initial dirty set
/// - runtime, executor and fingerprint store
/// - (optional) file watcher and stdin handling
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let graph = Arc::new(ProjectGraph::from_config(&cfg)?);

    let repo_root = config_root_dir(&config_path);
    let repo_root = repo_root.canonicalize().unwrap_or(repo_root);

    let initial = initial_dirty_set(&graph, &args.changed);

    if args.dry_run {
        print_dry_run(&graph, &initial);
        return Ok(());
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    // One token cache per session, shared by the watcher and the workers.
    let tokens = Arc::new(VersionTokenCache::new());
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let context = BuildContext::new(graph.clone(), repo_root.clone(), fs, tokens.clone());
    let executor = ShellExecutor::new(context, rt_tx.clone());

    let _watcher_handle = if !args.once {
        let options = WatchOptions {
            root: repo_root.clone(),
            cache_folder: graph.cache_folder().to_string(),
            delimiter: graph.delimiter(),
            debounce: DEFAULT_DEBOUNCE,
        };
        let handle = spawn_watcher(options, tokens.clone(), rt_tx.clone())?;
        spawn_stdin_commands(rt_tx.clone());
        Some(handle)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(projects = initial.len(), "initial dirty projects");
    rt_tx
        .send(RuntimeEvent::BuildRequested { projects: initial })
        .await?;

    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };
    let core = CoreRuntime::new(graph, cfg.config_section().parallelism, options);
    let summary = Runtime::new(core, rt_rx, executor).run().await?;

    info!(
        succeeded = ?summary.succeeded,
        failed = ?summary.failed,
        blocked = ?summary.blocked,
        "session finished"
    );
    if args.once && !summary.is_success() {
        bail!(
            "build failed: failed projects {:?}, blocked projects {:?}",
            summary.failed,
            summary.blocked
        );
    }
    Ok(())
}

/// Figure out the repository root.
///
/// - If the config path has a non-empty parent (e.g. "repo/Monowatch.toml"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Every project when no changed files are given; otherwise their owners.
fn initial_dirty_set(graph: &ProjectGraph, changed: &[String]) -> BTreeSet<ProjectId> {
    if changed.is_empty() {
        return graph.ids().collect();
    }
    graph.dirty_projects(&graph.path_index(), changed)
}

/// In watch mode, an empty line on stdin clears reported failures so that
/// buffered successes are shown.
fn spawn_stdin_commands(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() && tx.send(RuntimeEvent::ClearReportedFailures).await.is_err() {
                break;
            }
        }
    });
}

/// Dry-run output: projects, dependencies, critical path lengths and the
/// projects that would be considered.
fn print_dry_run(graph: &ProjectGraph, dirty: &BTreeSet<ProjectId>) {
    println!("monowatch dry-run");
    println!("  cache_folder = {}", graph.cache_folder());
    println!();

    println!("projects ({}):", graph.len());
    for id in graph.ids() {
        let project = graph.project(id);
        println!("  - {}", project.name);
        println!("      path: {}", project.path);
        println!("      cmd: {}", project.cmd);
        let deps: Vec<&str> = graph
            .dependencies_of(id)
            .into_iter()
            .map(|d| graph.name(d))
            .collect();
        if !deps.is_empty() {
            println!("      dependencies: {:?}", deps);
        }
        if !project.exclude.is_empty() {
            println!("      exclude: {:?}", project.exclude);
        }
        println!("      critical_path_length: {}", graph.critical_path_length(id));
    }

    let mut considered: BTreeSet<ProjectId> = dirty.clone();
    for id in dirty {
        considered.extend(graph.transitive_consumers(*id));
    }
    let names: Vec<&str> = considered.iter().map(|id| graph.name(*id)).collect();
    println!();
    println!("dirty ({}): {:?}", names.len(), names);

    debug!("dry-run complete (no execution)");
}
