//! Collaborator contracts for Codebox.
//!
//! The artifact bundling step lives outside this worker; the runner only
//! depends on the contract below.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Turns submitted artifact bytes into a single runnable entry script.
///
/// Implementations must be deterministic for a given artifact. A build
/// failure is reported as [`crate::Error::InvalidArtifact`] and aborts the
/// request before anything beyond directory preparation has touched the
/// sandbox — it is never converted into a verdict.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Build the runnable entry script for the given artifact bytes.
    async fn build(&self, artifact: &[u8]) -> Result<Bytes>;
}
