// src/engine/runtime.rs

use std::fmt;
use std::io::Write;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledBuild;
use crate::engine::collator::TerminalLine;
use crate::errors::Result;
use crate::exec::BuildExecutor;

use super::core::{CoreRuntime, SessionSummary};
use super::{CoreCommand, RuntimeEvent};

/// Drives the core in response to `RuntimeEvent`s, delegates builds to a
/// `BuildExecutor` and writes collated output to the terminal sink.
///
/// This is the only writer of the terminal; builds never print directly.
pub struct Runtime<E: BuildExecutor> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    terminal: Box<dyn Write + Send>,
}

impl<E: BuildExecutor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: BuildExecutor> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            terminal: Box::new(std::io::stdout()),
        }
    }

    /// Write collated output somewhere other than stdout.
    pub fn with_terminal(mut self, terminal: impl Write + Send + 'static) -> Self {
        self.terminal = Box::new(terminal);
        self
    }

    /// Main event loop. Returns the final state once the core asks to stop or
    /// every event sender is gone.
    pub async fn run(mut self) -> Result<SessionSummary> {
        info!("monowatch runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(self.core.summary())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchBuilds(builds) => self.dispatch(builds).await?,
            CoreCommand::WriteTerminal(lines) => self.write_terminal(&lines)?,
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, builds: Vec<ScheduledBuild>) -> Result<()> {
        if builds.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = builds.iter().map(|b| b.name.as_str()).collect();
        debug!(?names, "dispatching builds");

        self.executor.dispatch(builds).await
    }

    fn write_terminal(&mut self, lines: &[TerminalLine]) -> Result<()> {
        for line in lines {
            writeln!(self.terminal, "{line}")?;
        }
        self.terminal.flush()?;
        Ok(())
    }
}
