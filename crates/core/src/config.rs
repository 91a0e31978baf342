//! Worker configuration.
//!
//! Layered sources: `config/default`, an environment-specific file, a local
//! override file, then `CODEBOX__`-prefixed environment variables. Every
//! section has sensible defaults so the worker also runs with no config
//! files at all.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub docker: DockerConfig,
}

/// Sandbox pool sizing and placement.
#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    /// Number of sandbox slots allocated at startup. Also the bound on
    /// concurrent executions.
    pub capacity: usize,
    /// Directory under which slot working directories are created.
    pub root_dir: PathBuf,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            root_dir: PathBuf::from("/var/tmp/codebox"),
        }
    }
}

/// Per-execution settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    /// Wall-clock ceiling enforced by the isolation layer, in seconds.
    pub wall_time_secs: u64,
    /// Command line that starts the harness inside the sandbox.
    pub command: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            wall_time_secs: 15,
            command: "/usr/bin/node code-executor.js".to_string(),
        }
    }
}

/// Settings for the Docker isolation backend.
#[derive(Debug, Deserialize, Clone)]
pub struct DockerConfig {
    /// Image used for per-run containers.
    pub image: String,
    /// Maximum memory in bytes.
    pub memory_limit_bytes: i64,
    /// CPU quota against a 100ms period (100_000 = one core).
    pub cpu_quota: i64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            image: "codebox-sandbox:latest".to_string(),
            memory_limit_bytes: 512 * 1024 * 1024,
            cpu_quota: 100_000,
        }
    }
}

impl WorkerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("CODEBOX_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map CODEBOX__POOL__CAPACITY=8 to pool.capacity
            .add_source(Environment::with_prefix("CODEBOX").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.pool.capacity, 4);
        assert_eq!(cfg.execution.wall_time_secs, 15);
        assert!(cfg.execution.command.contains("code-executor.js"));
        assert_eq!(cfg.docker.cpu_quota, 100_000);
    }
}
