// src/engine/mod.rs

//! Watch/build coordination engine.
//!
//! This module ties together:
//! - the build scheduler
//! - per-project watch state and liveness
//! - terminal arbitration between concurrently building projects
//! - the main runtime event loop that reacts to file changes, build output,
//!   build completion and shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::collections::BTreeSet;

use crate::dag::ProjectId;

/// Verdict of one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The command ran and exited successfully.
    Succeeded,
    /// The fingerprint was up to date; the command did not run.
    Skipped,
    /// The command failed with this exit code (`-1` if it never ran).
    Failed(i32),
}

impl BuildOutcome {
    /// `Skipped` counts as success everywhere.
    pub fn is_success(self) -> bool {
        matches!(self, BuildOutcome::Succeeded | BuildOutcome::Skipped)
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once nothing is pending or running (`--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, the executor, etc.
///
/// Events of one project arrive in the order they were produced.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Build these projects (and their consumers), e.g. at startup.
    BuildRequested { projects: BTreeSet<ProjectId> },
    /// Repository-relative paths changed on disk.
    FilesChanged { paths: Vec<String> },
    /// One line of a running build's output.
    BuildOutput { project: ProjectId, line: String },
    /// A build finished.
    BuildCompleted {
        project: ProjectId,
        outcome: BuildOutcome,
    },
    /// Forget every reported failure so that buffered successes flush.
    ClearReportedFailures,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod collator;
pub mod core;
pub mod event_handlers;
pub mod liveness;
pub mod runtime;

pub use collator::{TerminalCollator, TerminalLine, Verdict};
pub use self::core::{CoreRuntime, SessionSummary};
pub use event_handlers::{CoreCommand, CoreStep};
pub use liveness::{ProjectStates, StateChange, WatchState};
pub use runtime::Runtime;
