#![deny(unused)]
//! Core types, traits, and error definitions for Codebox.
//!
//! This crate provides the foundational building blocks shared by the
//! sandbox and runner crates: the worker-wide error type, configuration
//! loading, the execution data model, and the collaborator contracts.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::ArtifactBuilder;
pub use types::*;
