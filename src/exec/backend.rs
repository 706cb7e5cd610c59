// src/exec/backend.rs

//! Pluggable build executor abstraction.
//!
//! The runtime talks to a `BuildExecutor` instead of spawning processes
//! itself, so tests can swap in a fake that replays scripted output.
//!
//! - `ShellExecutor` is the production implementation: it forwards builds to
//!   the background loop in [`executor_loop`](super::executor_loop).
//! - Implementations report back exclusively through `RuntimeEvent`s:
//!   `BuildOutput` for each line, then exactly one `BuildCompleted`.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::dag::ScheduledBuild;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::exec::context::BuildContext;

use super::executor_loop::spawn_executor;

/// Trait abstracting how scheduled builds are executed.
pub trait BuildExecutor: Send {
    /// Start the given builds. Must not wait for them to finish.
    fn dispatch(
        &mut self,
        builds: Vec<ScheduledBuild>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs each project's `cmd` through the platform shell.
pub struct ShellExecutor {
    tx: mpsc::Sender<ScheduledBuild>,
}

impl ShellExecutor {
    /// Spawns the background executor loop immediately.
    pub fn new(context: BuildContext, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(context, runtime_tx);
        Self { tx }
    }
}

impl BuildExecutor for ShellExecutor {
    fn dispatch(
        &mut self,
        builds: Vec<ScheduledBuild>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for build in builds {
                tx.send(build).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
