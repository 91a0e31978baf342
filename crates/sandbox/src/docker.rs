//! Docker isolation backend using the `bollard` crate.
//!
//! Each run gets a fresh container with the slot directory bind-mounted as
//! its working directory, no network, capped memory/CPU/pids, all
//! capabilities dropped, and no privilege escalation. The container is
//! force-removed afterwards, so the only trace of a run is what it wrote
//! into the slot directory.

use async_trait::async_trait;
use futures::StreamExt;
use std::time::Instant;

use codebox_core::config::DockerConfig;
use codebox_core::{Error, Result};

use crate::isolator::{Isolator, RunSpec};
use crate::layout;
use crate::meta::{status, MetaReport};

/// How a container run ended.
enum ContainerOutcome {
    Exited(i64),
    TimedOut,
}

/// Docker-based isolation backend.
pub struct DockerIsolator {
    docker: bollard::Docker,
    settings: DockerConfig,
}

impl DockerIsolator {
    /// Connect to the local Docker daemon.
    pub fn new(settings: DockerConfig) -> Result<Self> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            Error::isolation(format!(
                "failed to connect to Docker daemon: {}. Is Docker running?",
                e
            ))
        })?;
        Ok(Self { docker, settings })
    }

    /// Create from an existing bollard client (for testing).
    pub fn from_client(docker: bollard::Docker, settings: DockerConfig) -> Self {
        Self { docker, settings }
    }

    /// Check whether the Docker daemon is reachable.
    pub async fn is_available(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    async fn run_container(&self, spec: &RunSpec, name: &str) -> Result<ContainerOutcome> {
        use bollard::container::{Config, CreateContainerOptions, WaitContainerOptions};
        use bollard::models::HostConfig;

        let host_config = HostConfig {
            binds: Some(vec![format!("{}:/box", spec.box_dir.display())]),
            memory: Some(self.settings.memory_limit_bytes),
            cpu_quota: Some(self.settings.cpu_quota),
            cpu_period: Some(100_000), // standard 100ms period
            network_mode: Some("none".to_string()),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges:true".to_string()]),
            pids_limit: Some(100),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(self.settings.image.clone()),
            working_dir: Some("/box".to_string()),
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                spec.command.clone(),
            ]),
            host_config: Some(host_config),
            labels: Some(std::collections::HashMap::from([(
                "managed-by".to_string(),
                "codebox".to_string(),
            )])),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name,
            platform: None,
        };

        self.docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| Error::isolation(format!("failed to create run container: {}", e)))?;

        self.docker
            .start_container::<String>(name, None)
            .await
            .map_err(|e| Error::isolation(format!("failed to start run container: {}", e)))?;

        let mut wait = self
            .docker
            .wait_container(name, None::<WaitContainerOptions<String>>);

        match tokio::time::timeout(spec.wall_time, wait.next()).await {
            Ok(Some(Ok(response))) => Ok(ContainerOutcome::Exited(response.status_code)),
            Ok(Some(Err(e))) => Err(Error::isolation(format!(
                "failed to wait for run container: {}",
                e
            ))),
            Ok(None) => Err(Error::isolation(
                "run container wait stream ended without a status",
            )),
            Err(_elapsed) => {
                tracing::debug!(container = %name, "run container hit the wall-clock ceiling");
                Ok(ContainerOutcome::TimedOut)
            }
        }
    }

    /// Demux the container log into the slot's capture files.
    async fn collect_streams(&self, spec: &RunSpec, name: &str) -> Result<()> {
        use bollard::container::{LogOutput, LogsOptions};

        let mut logs = self.docker.logs(
            name,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some(chunk) = logs.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message }) => {
                    stdout.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(LogOutput::StdErr { message }) => {
                    stderr.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(container = %name, error = %e, "log stream ended early");
                    break;
                }
            }
        }

        tokio::fs::write(spec.box_dir.join(layout::STDOUT_FILE), stdout).await?;
        tokio::fs::write(spec.box_dir.join(layout::STDERR_FILE), stderr).await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) {
        use bollard::container::RemoveContainerOptions;

        if let Err(e) = self
            .docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            tracing::warn!(container = %name, error = %e, "failed to remove run container");
        }
    }
}

#[async_trait]
impl Isolator for DockerIsolator {
    async fn run(&self, spec: &RunSpec) -> Result<()> {
        let name = format!("codebox-run-{}", uuid::Uuid::new_v4());
        let started = Instant::now();
        let outcome = self.run_container(spec, &name).await;
        let elapsed = started.elapsed().as_secs_f64();

        if matches!(outcome, Ok(_)) {
            if let Err(e) = self.collect_streams(spec, &name).await {
                tracing::warn!(container = %name, error = %e, "failed to collect container streams");
            }
        }
        self.remove_container(&name).await;

        // Exit status mapping: 0 is a normal exit, >128 follows the shell
        // convention for signal deaths (e.g. 137 = SIGKILL), anything else
        // is the artifact's own failure. Backend errors become XX: the
        // isolation layer failed, not the artifact.
        let report = match outcome {
            Ok(ContainerOutcome::Exited(0)) => MetaReport {
                status: None,
                time_seconds: elapsed,
                message: None,
            },
            Ok(ContainerOutcome::Exited(code)) if code > 128 => MetaReport {
                status: Some(status::SIGNAL.to_string()),
                time_seconds: elapsed,
                message: Some(format!("container exited with status {}", code)),
            },
            Ok(ContainerOutcome::Exited(code)) => MetaReport {
                status: Some(status::RUNTIME.to_string()),
                time_seconds: elapsed,
                message: Some(format!("container exited with status {}", code)),
            },
            Ok(ContainerOutcome::TimedOut) => MetaReport {
                status: Some(status::TIMEOUT.to_string()),
                time_seconds: elapsed,
                message: Some("wall clock limit exceeded".to_string()),
            },
            Err(e) => {
                tracing::warn!(container = %name, error = %e, "docker backend failure absorbed into meta report");
                MetaReport {
                    status: Some(status::INTERNAL.to_string()),
                    time_seconds: elapsed,
                    message: Some(e.to_string()),
                }
            }
        };

        tokio::fs::write(spec.box_dir.join(layout::META_FILE), report.render()).await?;
        Ok(())
    }
}
