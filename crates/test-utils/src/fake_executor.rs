use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use monowatch::dag::ScheduledBuild;
use monowatch::engine::{BuildOutcome, RuntimeEvent};
use monowatch::exec::BuildExecutor;
use monowatch::errors::Result;

/// What a fake build prints and how it ends.
#[derive(Debug, Clone)]
pub struct ScriptedBuild {
    pub lines: Vec<String>,
    pub outcome: BuildOutcome,
}

/// A fake executor that:
/// - records which projects were "built"
/// - replays scripted output lines for each build
/// - reports the scripted outcome (`Succeeded` when nothing is scripted).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    scripts: HashMap<String, ScriptedBuild>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            scripts: HashMap::new(),
        }
    }

    /// Script the output and outcome of every build of `project`.
    pub fn script(mut self, project: &str, lines: &[&str], outcome: BuildOutcome) -> Self {
        self.scripts.insert(
            project.to_string(),
            ScriptedBuild {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                outcome,
            },
        );
        self
    }
}

impl BuildExecutor for FakeExecutor {
    fn dispatch(
        &mut self,
        builds: Vec<ScheduledBuild>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let scripted: Vec<(ScheduledBuild, Option<ScriptedBuild>)> = builds
            .into_iter()
            .map(|b| {
                let script = self.scripts.get(&b.name).cloned();
                (b, script)
            })
            .collect();

        Box::pin(async move {
            for (build, script) in scripted {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(build.name.clone());
                }

                let script = script.unwrap_or(ScriptedBuild {
                    lines: Vec::new(),
                    outcome: BuildOutcome::Succeeded,
                });

                for line in script.lines {
                    tx.send(RuntimeEvent::BuildOutput {
                        project: build.project,
                        line,
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
                }

                tx.send(RuntimeEvent::BuildCompleted {
                    project: build.project,
                    outcome: script.outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// Clonable in-memory terminal, so tests can inspect what the runtime wrote.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(|l| l.to_string()).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
