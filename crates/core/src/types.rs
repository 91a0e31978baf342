//! Execution data model: requests, results, and the verdict enumeration.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed classification of a finished execution.
///
/// Every meta-report status code maps to exactly one verdict;
/// `UnknownStatus` is the catch-all for status codes the classifier does
/// not recognize, so that new isolation-layer codes can never crash the
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The harness completed normally.
    Success,
    /// The artifact raised an error during its own execution.
    RuntimeError,
    /// The process was terminated by a signal.
    Crashed,
    /// The wall-clock ceiling was exceeded.
    Timeout,
    /// The isolation layer itself failed, not the artifact.
    InternalError,
    /// A status code not recognized by the classifier.
    UnknownStatus,
}

impl Verdict {
    /// Whether the execution completed normally.
    pub fn is_success(self) -> bool {
        matches!(self, Verdict::Success)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Success => "success",
            Verdict::RuntimeError => "runtime-error",
            Verdict::Crashed => "crashed",
            Verdict::Timeout => "timeout",
            Verdict::InternalError => "internal-error",
            Verdict::UnknownStatus => "unknown-status",
        };
        write!(f, "{}", s)
    }
}

/// One code execution request.
///
/// The artifact bytes are opaque to the runner; only the builder
/// collaborator understands them. The input must be JSON-representable
/// since it is serialized to a file consumed by the harness.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Packaged code unit to execute.
    pub artifact: Bytes,
    /// Structured input handed to the artifact.
    pub input: Value,
}

impl ExecutionRequest {
    /// Create a request from artifact bytes and a structured input value.
    pub fn new(artifact: impl Into<Bytes>, input: Value) -> Self {
        Self {
            artifact: artifact.into(),
            input,
        }
    }
}

/// Outcome of one execution, assembled from the sandbox outputs.
///
/// Created and discarded within one runner invocation; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Classified outcome.
    pub verdict: Verdict,
    /// Wall-clock seconds reported by the isolation layer.
    pub time_seconds: f64,
    /// Captured standard output.
    pub standard_output: String,
    /// Captured standard error.
    pub standard_error: String,
    /// Value returned by the artifact, absent when it produced none.
    pub output: Option<Value>,
}
