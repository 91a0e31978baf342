//! Slot directory layout — the file contract with the execution harness.
//!
//! The harness is a fixed external script. It expects the entry script and
//! the serialized input under these names, and writes its results back into
//! the same directory. The isolation layer contributes the meta report and
//! the captured standard streams.

/// Built artifact, the script the harness loads.
pub const ENTRY_FILE: &str = "index.js";

/// JSON-serialized input value consumed by the harness.
pub const INPUT_FILE: &str = "_input.txt";

/// The harness script itself, copied in verbatim per run.
pub const HARNESS_FILE: &str = "code-executor.js";

/// Meta report written by the isolation layer: status code + elapsed time.
pub const META_FILE: &str = "meta.txt";

/// Captured standard output.
pub const STDOUT_FILE: &str = "_standardOutput.txt";

/// Captured standard error.
pub const STDERR_FILE: &str = "_standardError.txt";

/// JSON value returned by the artifact; absent when it produced none.
pub const OUTPUT_FILE: &str = "_functionOutput.txt";
