//! Error types for Codebox.
//!
//! Execution outcomes (timeouts, crashes, runtime errors inside the
//! artifact) are NOT errors — they are verdicts derived from the meta
//! report. The variants here cover infrastructure failures only: the
//! conditions under which no execution outcome could be determined.

use thiserror::Error;

/// Result type alias using Codebox's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Codebox.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Artifact Errors
    // =========================================================================
    /// The artifact could not be turned into a runnable script. Raised by
    /// the builder collaborator before execution starts; never a verdict.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    // =========================================================================
    // Sandbox Errors
    // =========================================================================
    /// The sandbox working directory could not be reset to a clean state.
    /// A dirty directory would leak state between unrelated executions, so
    /// this aborts the request.
    #[error("sandbox reset failed: {0}")]
    SandboxReset(String),

    /// The isolation layer produced no meta report, so no verdict can be
    /// derived for the request.
    #[error("meta report not found: {0}")]
    MissingMetaReport(String),

    /// The meta report exists but could not be parsed (e.g. a malformed
    /// time field).
    #[error("malformed meta report: {0}")]
    MalformedMetaReport(String),

    /// The isolation backend itself failed in a way that prevented the run
    /// from being attempted at all.
    #[error("isolation failure: {0}")]
    Isolation(String),

    // =========================================================================
    // Pool Errors
    // =========================================================================
    /// The sandbox pool has been shut down; no further leases are granted.
    #[error("sandbox pool is closed")]
    PoolClosed,

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid artifact error.
    pub fn invalid_artifact(msg: impl Into<String>) -> Self {
        Self::InvalidArtifact(msg.into())
    }

    /// Create a sandbox reset error.
    pub fn sandbox_reset(msg: impl Into<String>) -> Self {
        Self::SandboxReset(msg.into())
    }

    /// Create a missing meta report error.
    pub fn missing_meta_report(msg: impl Into<String>) -> Self {
        Self::MissingMetaReport(msg.into())
    }

    /// Create a malformed meta report error.
    pub fn malformed_meta_report(msg: impl Into<String>) -> Self {
        Self::MalformedMetaReport(msg.into())
    }

    /// Create an isolation failure error.
    pub fn isolation(msg: impl Into<String>) -> Self {
        Self::Isolation(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
