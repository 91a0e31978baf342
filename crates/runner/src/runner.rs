//! End-to-end execution of one request.

use std::sync::Arc;

use codebox_core::config::ExecutionConfig;
use codebox_core::{ArtifactBuilder, ExecutionRequest, ExecutionResult, Result};
use codebox_sandbox::{layout, SandboxLease, SandboxPool};

use crate::classify::classify;

/// The fixed harness script, embedded at build time and copied into the
/// sandbox verbatim for every run.
pub const HARNESS_SOURCE: &[u8] = include_bytes!("../resources/code-executor.js");

/// Orchestrates one execution request end-to-end:
/// lease → prepare → execute → collect → classify → release.
///
/// The runner implements no timer of its own — the wall-clock ceiling lives
/// in the isolation layer, and the meta report's status is trusted as the
/// outcome. There are no retries; a failed or timed-out execution is
/// reported once and resubmission is the caller's decision.
pub struct CodeRunner {
    pool: Arc<SandboxPool>,
    builder: Arc<dyn ArtifactBuilder>,
    command: String,
}

impl CodeRunner {
    pub fn new(
        pool: Arc<SandboxPool>,
        builder: Arc<dyn ArtifactBuilder>,
        execution: &ExecutionConfig,
    ) -> Self {
        Self {
            pool,
            builder,
            command: execution.command.clone(),
        }
    }

    /// Run one request and return its structured outcome.
    ///
    /// Infrastructure failures (invalid artifact, sandbox reset failure,
    /// missing or malformed meta report) surface as errors: no execution
    /// outcome could be determined, and no verdict is fabricated. In every
    /// case the leased slot is back in the pool before this returns.
    pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let execution_id = uuid::Uuid::new_v4();
        let mut lease = self.pool.obtain().await?;
        tracing::info!(
            execution = %execution_id,
            slot = lease.id(),
            "starting code execution"
        );

        let result = self.run_leased(&mut lease, request).await;
        match &result {
            Ok(outcome) => tracing::info!(
                execution = %execution_id,
                slot = lease.id(),
                verdict = %outcome.verdict,
                time_seconds = outcome.time_seconds,
                "finished code execution"
            ),
            Err(error) => tracing::warn!(
                execution = %execution_id,
                slot = lease.id(),
                error = %error,
                "code execution failed without a verdict"
            ),
        }

        // The lease guard drops here, releasing the slot on every path.
        result
    }

    async fn run_leased(
        &self,
        lease: &mut SandboxLease,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult> {
        lease.clean_and_init().await?;

        // The builder runs before anything beyond directory preparation has
        // touched the slot; its failure aborts the request as a distinct
        // invalid-artifact error.
        let bundled = self.builder.build(&request.artifact).await?;

        lease.write_file(layout::ENTRY_FILE, &bundled).await?;
        lease
            .write_file(layout::INPUT_FILE, &serde_json::to_vec(&request.input)?)
            .await?;
        lease.write_file(layout::HARNESS_FILE, HARNESS_SOURCE).await?;

        // Deliberately absorbed: the meta report is the only authoritative
        // record of what happened to the sandboxed process (see the
        // isolation-layer contract). If the report is missing too, the
        // collect step below raises the distinct no-report error.
        if let Err(error) = lease.execute(&self.command).await {
            tracing::debug!(
                slot = lease.id(),
                error = %error,
                "execution error absorbed; meta report is authoritative"
            );
        }

        let outputs = lease.collect_outputs().await?;
        Ok(ExecutionResult {
            verdict: classify(outputs.meta.status.as_deref()),
            time_seconds: outputs.meta.time_seconds,
            standard_output: outputs.standard_output,
            standard_error: outputs.standard_error,
            output: outputs.output,
        })
    }
}
