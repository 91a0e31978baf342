//! Isolation backends.
//!
//! An [`Isolator`] runs one command inside a slot directory under a
//! wall-clock ceiling, captures the standard streams into the slot's files,
//! and writes the meta report. The sandboxed process's own failure — a
//! non-zero exit, a signal, the ceiling kicking in — is absorbed into that
//! report rather than raised: the meta report is the only authoritative
//! record of the run, and callers must consult it instead of an error path.
//! Only infrastructure failures (the backend could not even attempt the
//! run, or could not write the capture files) surface as errors.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use codebox_core::Result;

use crate::layout;
use crate::meta::{status, MetaReport};

/// Everything one isolation-layer run needs to know.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Slot working directory; also the command's working directory.
    pub box_dir: PathBuf,
    /// Command line to run. Whitespace-split, no shell interpretation.
    pub command: String,
    /// Wall-clock ceiling after which the process is killed.
    pub wall_time: Duration,
}

/// Trait for isolation backends.
#[async_trait]
pub trait Isolator: Send + Sync {
    /// Run the command and leave the meta report plus captured streams in
    /// the slot directory. See the module docs for the absorption contract.
    async fn run(&self, spec: &RunSpec) -> Result<()>;
}

// =============================================================================
// Process Isolator
// =============================================================================

/// Direct-process isolation backend.
///
/// Spawns the command with stdout/stderr redirected into the slot's capture
/// files and enforces the wall-clock ceiling with a kill. Each slot has its
/// own working directory, and the pool serializes access to it, so runs
/// never observe each other's files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessIsolator;

/// How a spawned process ended, before mapping to a meta report.
enum ProcessOutcome {
    Exited(std::process::ExitStatus),
    TimedOut,
    SpawnFailed(std::io::Error),
}

impl ProcessIsolator {
    async fn launch(&self, spec: &RunSpec) -> Result<ProcessOutcome> {
        let mut parts = spec.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(ProcessOutcome::SpawnFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command line",
            )));
        };

        // Capture files must exist even if the process never starts; a
        // failure here is an infrastructure error, not a run outcome.
        let stdout = std::fs::File::create(spec.box_dir.join(layout::STDOUT_FILE))?;
        let stderr = std::fs::File::create(spec.box_dir.join(layout::STDERR_FILE))?;

        let child = tokio::process::Command::new(program)
            .args(parts)
            .current_dir(&spec.box_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(err) => return Ok(ProcessOutcome::SpawnFailed(err)),
        };

        match tokio::time::timeout(spec.wall_time, child.wait()).await {
            Ok(Ok(exit)) => Ok(ProcessOutcome::Exited(exit)),
            Ok(Err(err)) => Ok(ProcessOutcome::SpawnFailed(err)),
            Err(_elapsed) => {
                let _ = child.kill().await;
                Ok(ProcessOutcome::TimedOut)
            }
        }
    }
}

#[cfg(unix)]
fn termination_signal(exit: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    exit.signal()
}

#[cfg(not(unix))]
fn termination_signal(_exit: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[async_trait]
impl Isolator for ProcessIsolator {
    async fn run(&self, spec: &RunSpec) -> Result<()> {
        let started = Instant::now();
        let outcome = self.launch(spec).await?;
        let elapsed = started.elapsed().as_secs_f64();

        let report = match outcome {
            ProcessOutcome::Exited(exit) if exit.success() => MetaReport {
                status: None,
                time_seconds: elapsed,
                message: None,
            },
            ProcessOutcome::Exited(exit) => match termination_signal(&exit) {
                Some(signal) => {
                    tracing::debug!(signal, "sandboxed process terminated by signal");
                    MetaReport {
                        status: Some(status::SIGNAL.to_string()),
                        time_seconds: elapsed,
                        message: Some(format!("terminated by signal {}", signal)),
                    }
                }
                None => {
                    let code = exit.code().unwrap_or(-1);
                    tracing::debug!(code, "sandboxed process exited non-zero");
                    MetaReport {
                        status: Some(status::RUNTIME.to_string()),
                        time_seconds: elapsed,
                        message: Some(format!("exited with code {}", code)),
                    }
                }
            },
            ProcessOutcome::TimedOut => {
                tracing::debug!(
                    wall_time_secs = spec.wall_time.as_secs_f64(),
                    "sandboxed process hit the wall-clock ceiling"
                );
                MetaReport {
                    status: Some(status::TIMEOUT.to_string()),
                    time_seconds: elapsed,
                    message: Some("wall clock limit exceeded".to_string()),
                }
            }
            ProcessOutcome::SpawnFailed(err) => {
                tracing::warn!(error = %err, command = %spec.command, "isolation layer could not start the process");
                MetaReport {
                    status: Some(status::INTERNAL.to_string()),
                    time_seconds: elapsed,
                    message: Some(format!("failed to start process: {}", err)),
                }
            }
        };

        tokio::fs::write(spec.box_dir.join(layout::META_FILE), report.render()).await?;
        Ok(())
    }
}

// =============================================================================
// Mock Isolator (for tests without subprocesses or Docker)
// =============================================================================

/// Canned behavior for one mock run.
#[derive(Debug, Clone)]
pub struct MockRun {
    /// Raw meta report content. `None` means the isolation layer died
    /// before writing any report at all.
    pub meta: Option<String>,
    /// Files written into the slot directory, as (name, content) pairs.
    pub files: Vec<(String, String)>,
}

impl MockRun {
    /// A normal completion with the given return-value JSON.
    pub fn success(output_json: &str) -> Self {
        Self {
            meta: Some("time:0.042\n".to_string()),
            files: vec![(layout::OUTPUT_FILE.to_string(), output_json.to_string())],
        }
    }

    /// A run that ended with the given status code.
    pub fn with_status(code: &str) -> Self {
        Self {
            meta: Some(format!("time:0.042\nstatus:{}\n", code)),
            files: Vec::new(),
        }
    }

    /// The isolation layer vanished without leaving a report.
    pub fn no_report() -> Self {
        Self {
            meta: None,
            files: Vec::new(),
        }
    }

    /// Attach an extra file to the canned run.
    pub fn with_file(mut self, name: &str, content: &str) -> Self {
        self.files.push((name.to_string(), content.to_string()));
        self
    }
}

/// Scripted isolation backend for unit and integration tests.
///
/// Pops one canned [`MockRun`] per invocation and materializes it in the
/// slot directory; once the script is exhausted it falls back to a plain
/// success with no return value.
#[derive(Default)]
pub struct MockIsolator {
    runs: std::sync::Mutex<Vec<MockRun>>,
}

impl MockIsolator {
    /// Create a mock backend with a scripted sequence of runs.
    pub fn new(runs: Vec<MockRun>) -> Self {
        Self {
            runs: std::sync::Mutex::new(runs),
        }
    }
}

#[async_trait]
impl Isolator for MockIsolator {
    async fn run(&self, spec: &RunSpec) -> Result<()> {
        let run = {
            let mut runs = self.runs.lock().expect("mock run script poisoned");
            if runs.is_empty() {
                MockRun {
                    meta: Some("time:0.001\n".to_string()),
                    files: Vec::new(),
                }
            } else {
                runs.remove(0)
            }
        };

        for (name, content) in &run.files {
            tokio::fs::write(spec.box_dir.join(name), content).await?;
        }
        if let Some(meta) = &run.meta {
            tokio::fs::write(spec.box_dir.join(layout::META_FILE), meta).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_in(dir: &std::path::Path, command: &str, wall_time: Duration) -> RunSpec {
        RunSpec {
            box_dir: dir.to_path_buf(),
            command: command.to_string(),
            wall_time,
        }
    }

    async fn run_and_read(dir: &std::path::Path, command: &str, wall: Duration) -> MetaReport {
        let isolator = ProcessIsolator;
        isolator
            .run(&spec_in(dir, command, wall))
            .await
            .expect("isolator run");
        let raw = tokio::fs::read_to_string(dir.join(layout::META_FILE))
            .await
            .expect("meta report written");
        MetaReport::parse(&raw).expect("meta report parseable")
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn normal_exit_has_no_status() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("run.sh"), "echo hello\n")
            .await
            .unwrap();

        let report = run_and_read(dir.path(), "/bin/sh run.sh", Duration::from_secs(5)).await;
        assert_eq!(report.status, None);

        let stdout = tokio::fs::read_to_string(dir.path().join(layout::STDOUT_FILE))
            .await
            .unwrap();
        assert_eq!(stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_runtime_status() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("run.sh"), "echo boom 1>&2\nexit 3\n")
            .await
            .unwrap();

        let report = run_and_read(dir.path(), "/bin/sh run.sh", Duration::from_secs(5)).await;
        assert_eq!(report.status.as_deref(), Some(status::RUNTIME));

        let stderr = tokio::fs::read_to_string(dir.path().join(layout::STDERR_FILE))
            .await
            .unwrap();
        assert!(stderr.contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn wall_clock_ceiling_kills_and_reports_timeout() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("run.sh"), "sleep 30\n")
            .await
            .unwrap();

        let started = Instant::now();
        let report = run_and_read(dir.path(), "/bin/sh run.sh", Duration::from_secs(1)).await;
        let overshoot = started.elapsed();

        assert_eq!(report.status.as_deref(), Some(status::TIMEOUT));
        assert!(
            overshoot < Duration::from_secs(5),
            "kill should be prompt, took {:?}",
            overshoot
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_termination_is_crash_status() {
        let dir = tempfile::tempdir().unwrap();
        // The script kills its own interpreter with SIGSEGV.
        tokio::fs::write(dir.path().join("run.sh"), "kill -SEGV $$\n")
            .await
            .unwrap();

        let report = run_and_read(dir.path(), "/bin/sh run.sh", Duration::from_secs(5)).await;
        assert_eq!(report.status.as_deref(), Some(status::SIGNAL));
    }

    #[tokio::test]
    async fn unstartable_command_is_internal_status() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_and_read(
            dir.path(),
            "/definitely/not/a/real/binary",
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(report.status.as_deref(), Some(status::INTERNAL));
        assert!(report.message.is_some());
    }

    #[tokio::test]
    async fn mock_isolator_materializes_scripted_run() {
        let dir = tempfile::tempdir().unwrap();
        let isolator = MockIsolator::new(vec![
            MockRun::success("{\"sum\":3}").with_file(layout::STDOUT_FILE, "hi\n")
        ]);

        isolator
            .run(&spec_in(dir.path(), "ignored", Duration::from_secs(1)))
            .await
            .unwrap();

        let meta = tokio::fs::read_to_string(dir.path().join(layout::META_FILE))
            .await
            .unwrap();
        assert!(meta.starts_with("time:"));
        let output = tokio::fs::read_to_string(dir.path().join(layout::OUTPUT_FILE))
            .await
            .unwrap();
        assert_eq!(output, "{\"sum\":3}");
    }
}
