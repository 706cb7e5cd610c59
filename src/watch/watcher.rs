// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::fingerprint::VersionTokenCache;
use crate::watch::path_utils::changed_path;

/// Default quiet period used to coalesce bursts of filesystem events.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// What the watcher observes and how it reports it.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Repository root, watched recursively.
    pub root: PathBuf,
    /// Per-project cache folder name; changes inside it dirty nothing.
    pub cache_folder: String,
    /// Delimiter of the reported repository-relative paths.
    pub delimiter: char,
    pub debounce: Duration,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping it stops
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that sends `RuntimeEvent::FilesChanged` with
/// repository-relative paths.
///
/// Every reported path is also invalidated in `tokens`, so the next
/// fingerprint check re-hashes it.
pub fn spawn_watcher(
    options: WatchOptions,
    tokens: Arc<VersionTokenCache>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("monowatch: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("monowatch: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&options.root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", options.root);

    tokio::spawn(async move {
        'events: while let Some(event) = event_rx.recv().await {
            let mut batch = BTreeSet::new();
            collect_event(&options, &tokens, event, &mut batch);

            // Coalesce the burst that usually follows one save.
            loop {
                match tokio::time::timeout(options.debounce, event_rx.recv()).await {
                    Ok(Some(event)) => collect_event(&options, &tokens, event, &mut batch),
                    Ok(None) => break 'events,
                    Err(_) => break,
                }
            }

            if batch.is_empty() {
                continue;
            }

            debug!(files = batch.len(), "forwarding changed files");
            let paths = batch.into_iter().collect();
            if runtime_tx
                .send(RuntimeEvent::FilesChanged { paths })
                .await
                .is_err()
            {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

fn collect_event(
    options: &WatchOptions,
    tokens: &VersionTokenCache,
    event: Event,
    batch: &mut BTreeSet<String>,
) {
    // Reads (including our own hashing) must not trigger builds.
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    for path in event.paths {
        tokens.invalidate(&path);
        tokens.invalidate_under(&path);

        if let Some(rel) = changed_path(&options.root, &path, &options.cache_folder, options.delimiter) {
            batch.insert(rel);
        }
    }
}
