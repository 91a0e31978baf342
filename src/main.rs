#![deny(unused)]
//! Codebox worker CLI.
//!
//! Executes a single prebundled artifact in the sandbox pool and prints the
//! structured outcome. The serving surface that feeds requests to the
//! runner in production lives outside this repository; this binary wires
//! config, tracing, pool, and runner together for one-shot use.

use std::sync::Arc;
use std::time::Duration;

use codebox_core::config::WorkerConfig;
use codebox_core::{telemetry, ExecutionRequest};
use codebox_runner::{CodeRunner, PrebundledBuilder};
use codebox_sandbox::{DockerIsolator, Isolator, ProcessIsolator, SandboxPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::configure_tracing()?;

    let mut args = std::env::args().skip(1);
    let Some(artifact_path) = args.next() else {
        eprintln!("usage: codebox <artifact-script> [input-json]");
        std::process::exit(2);
    };
    let input: serde_json::Value = match args.next() {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::Value::Null,
    };

    let config = WorkerConfig::load().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "no worker config found, using defaults");
        WorkerConfig::default()
    });

    let isolator: Arc<dyn Isolator> = match std::env::var("CODEBOX_BACKEND").as_deref() {
        Ok("docker") => {
            let docker = DockerIsolator::new(config.docker.clone())?;
            if !docker.is_available().await {
                anyhow::bail!("Docker backend selected but the daemon is not reachable");
            }
            tracing::info!(image = %config.docker.image, "using Docker isolation backend");
            Arc::new(docker)
        }
        _ => Arc::new(ProcessIsolator),
    };

    let wall_time = Duration::from_secs(config.execution.wall_time_secs);
    let pool = Arc::new(SandboxPool::new(&config.pool, wall_time, isolator)?);
    let runner = CodeRunner::new(
        Arc::clone(&pool),
        Arc::new(PrebundledBuilder),
        &config.execution,
    );

    let artifact = tokio::fs::read(&artifact_path).await?;
    let result = runner.run(&ExecutionRequest::new(artifact, input)).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    pool.shutdown().await?;
    Ok(())
}
