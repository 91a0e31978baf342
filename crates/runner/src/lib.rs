#![deny(unused)]
//! Execution orchestration for Codebox.
//!
//! Ties the pieces together: lease a sandbox slot, prepare it (build the
//! artifact, write the input and the harness), run the harness under the
//! isolation layer, collect the outputs, and classify the verdict. The
//! slot is released on every path — success, verdict failure, or
//! infrastructure error — via the lease guard.

pub mod builder;
pub mod classify;
pub mod runner;

pub use builder::PrebundledBuilder;
pub use classify::classify;
pub use runner::{CodeRunner, HARNESS_SOURCE};
