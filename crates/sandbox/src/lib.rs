#![deny(unused)]
//! Sandbox slots, pooling, and isolation backends for Codebox.
//!
//! This crate owns the execution substrate: a fixed-size pool of sandbox
//! slots (one working directory each), exclusive RAII leases over them, and
//! the isolation layer that actually runs a command under a resource
//! ceiling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Runner (one request end-to-end)        │
//! │    ↓ obtain() / release on drop         │
//! ├─────────────────────────────────────────┤
//! │  SandboxPool (capacity = C slots)       │
//! │    ↓ exclusive SandboxLease             │
//! ├─────────────────────────────────────────┤
//! │  Sandbox slot (own directory, serial)   │
//! │    ↓ execute via Isolator               │
//! ├─────────────────────────────────────────┤
//! │  Isolation layer                        │
//! │    process / Docker container / mock    │
//! │    writes meta.txt + captured streams   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The isolation layer never surfaces the sandboxed process's own failure
//! as an error: the outcome is absorbed into the meta report, which is the
//! only authoritative record of what happened.

pub mod docker;
pub mod isolator;
pub mod layout;
pub mod meta;
pub mod pool;
pub mod slot;

pub use docker::DockerIsolator;
pub use isolator::{Isolator, MockIsolator, MockRun, ProcessIsolator, RunSpec};
pub use meta::MetaReport;
pub use pool::{SandboxLease, SandboxPool};
pub use slot::{RunOutputs, Sandbox, SlotState};
