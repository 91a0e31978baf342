//! A single sandbox slot: one isolated execution environment.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use codebox_core::{Error, Result};

use crate::isolator::{Isolator, RunSpec};
use crate::layout;
use crate::meta::MetaReport;

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Sitting in the pool's free list.
    Free,
    /// Exclusively held by one caller.
    Leased,
    /// A command is currently running inside it.
    Executing,
    /// The last reset failed; the next lease must re-initialize it.
    Faulted,
}

/// Everything the sandbox directory yielded after a run.
///
/// Collected in one pass so a caller can never observe a partial mixture of
/// two runs, even if a slot were ever misused concurrently. The pool
/// already serializes slot access; this is defense in depth.
#[derive(Debug, Clone)]
pub struct RunOutputs {
    /// Parsed meta report.
    pub meta: MetaReport,
    /// Captured standard output, empty when nothing was captured.
    pub standard_output: String,
    /// Captured standard error, empty when nothing was captured.
    pub standard_error: String,
    /// Artifact return value, `None` when it produced none.
    pub output: Option<Value>,
}

/// One isolated execution slot with its own working directory.
///
/// Slots are created by the pool at startup and live for the process
/// lifetime; exclusivity is enforced by the pool's leasing.
pub struct Sandbox {
    id: usize,
    dir: PathBuf,
    state: SlotState,
    isolator: Arc<dyn Isolator>,
    wall_time: Duration,
}

impl Sandbox {
    pub(crate) fn new(
        id: usize,
        root: &Path,
        isolator: Arc<dyn Isolator>,
        wall_time: Duration,
    ) -> Self {
        Self {
            id,
            dir: root.join(id.to_string()),
            state: SlotState::Free,
            isolator,
            wall_time,
        }
    }

    /// Slot identifier, stable for the process lifetime.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Working directory for this slot, stable for the slot's lifetime.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SlotState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SlotState) {
        self.state = state;
    }

    /// Wipe the working directory and recreate it empty.
    ///
    /// Idempotent. A failure here is the distinct
    /// [`Error::SandboxReset`]: a directory that cannot be guaranteed clean
    /// would leak state between unrelated executions, which is a
    /// correctness violation, so the request must abort. The slot is marked
    /// [`SlotState::Faulted`] and stays safely releasable — the next
    /// lease's reset retries.
    pub async fn clean_and_init(&mut self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                self.state = SlotState::Faulted;
                return Err(Error::sandbox_reset(format!(
                    "failed to wipe {}: {}",
                    self.dir.display(),
                    e
                )));
            }
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            self.state = SlotState::Faulted;
            return Err(Error::sandbox_reset(format!(
                "failed to recreate {}: {}",
                self.dir.display(),
                e
            )));
        }
        self.state = SlotState::Leased;
        tracing::debug!(slot = self.id, "sandbox directory reset");
        Ok(())
    }

    /// Materialize a file inside the slot directory.
    ///
    /// `name` must stay inside the directory; anything else is refused.
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<()> {
        if Path::new(name)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
            || name.is_empty()
        {
            return Err(Error::internal(format!(
                "refusing to write outside the sandbox directory: {:?}",
                name
            )));
        }
        tokio::fs::write(self.dir.join(name), bytes).await?;
        Ok(())
    }

    /// Run a command inside the slot under the configured resource ceiling.
    ///
    /// CONTRACT: a non-zero exit or enforced termination of the sandboxed
    /// process is not surfaced here — the isolation layer absorbs it into
    /// the meta report, and [`Sandbox::collect_outputs`] is the only way to
    /// learn the true outcome. Do not "fix" this by propagating process
    /// failures; only backend infrastructure errors escape.
    pub async fn execute(&mut self, command: &str) -> Result<()> {
        let spec = RunSpec {
            box_dir: self.dir.clone(),
            command: command.to_string(),
            wall_time: self.wall_time,
        };
        self.state = SlotState::Executing;
        let result = self.isolator.run(&spec).await;
        self.state = SlotState::Leased;
        result
    }

    /// Read everything the run left behind, in one pass.
    ///
    /// The meta report is mandatory: without it no verdict can be derived,
    /// so its absence is the distinct [`Error::MissingMetaReport`]. Stream
    /// captures default to empty, and a missing return-value file means the
    /// artifact produced no value. A return-value file that is not valid
    /// JSON is logged and treated as absent — that file is harness-owned.
    pub async fn collect_outputs(&self) -> Result<RunOutputs> {
        let meta_path = self.dir.join(layout::META_FILE);
        let raw = match tokio::fs::read_to_string(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::missing_meta_report(format!(
                    "{} does not exist",
                    meta_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = MetaReport::parse(&raw)?;

        let standard_output = tokio::fs::read_to_string(self.dir.join(layout::STDOUT_FILE))
            .await
            .unwrap_or_default();
        let standard_error = tokio::fs::read_to_string(self.dir.join(layout::STDERR_FILE))
            .await
            .unwrap_or_default();

        let output = match tokio::fs::read(self.dir.join(layout::OUTPUT_FILE)).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(slot = self.id, error = %e, "return-value file is not valid JSON; treating as absent");
                    None
                }
            },
            Err(_) => None,
        };

        Ok(RunOutputs {
            meta,
            standard_output,
            standard_error,
            output,
        })
    }
}
