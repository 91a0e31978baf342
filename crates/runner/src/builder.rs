//! Prebundled artifact builder.
//!
//! The real bundling step (turning raw submitted code plus its dependencies
//! into one script) is an external collaborator behind the
//! [`ArtifactBuilder`] contract. This implementation covers artifacts that
//! already arrive as a single runnable script: it validates the payload and
//! passes it through unchanged.

use async_trait::async_trait;
use bytes::Bytes;

use codebox_core::{ArtifactBuilder, Error, Result};

/// Accepts already-bundled UTF-8 scripts verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrebundledBuilder;

#[async_trait]
impl ArtifactBuilder for PrebundledBuilder {
    async fn build(&self, artifact: &[u8]) -> Result<Bytes> {
        if artifact.is_empty() {
            return Err(Error::invalid_artifact("artifact is empty"));
        }
        std::str::from_utf8(artifact)
            .map_err(|e| Error::invalid_artifact(format!("artifact is not UTF-8 text: {}", e)))?;
        Ok(Bytes::copy_from_slice(artifact))
    }
}
